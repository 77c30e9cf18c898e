// Service layer: the two sibling services plus the uniform outcome shapes
// they hand back to the UI.
pub mod outcome;
pub mod reactions;
pub mod social_graph;

pub use outcome::{
    AverageRatingOutcome, FriendshipStatus, OpOutcome, RatingOutcome, ReactionTotals,
    ToggleAction, ToggleOutcome, UserRatingOutcome,
};
pub use reactions::ReactionService;
pub use social_graph::SocialGraphService;

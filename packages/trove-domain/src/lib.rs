pub mod candidate;
pub mod cart;
pub mod intent;
pub mod interaction;
pub mod terms;
pub mod time_serde;

pub use candidate::{Candidate, Dimensions, Review};
pub use cart::{Cart, CartItem};
pub use intent::{BrandFilter, FilterCriteria, IntentViolation, QueryIntent};
pub use interaction::{Interaction, InteractionDetail, SearchDetail};

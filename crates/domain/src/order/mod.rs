//! The order aggregate and its value objects.

pub mod model;
pub mod status;
pub mod value_objects;

pub use model::{Order, OrderItem};
pub use status::{OrderStatus, PaymentStatus};
pub use value_objects::{Money, ProductId};

pub mod issue;
pub mod item;
pub mod location;
pub mod report;
pub mod user;

pub use issue::{Issue, IssueDetail, IssueRequest, IssueStatus};
pub use item::{Item, ItemInput, ItemPage, ItemQuery};
pub use location::{Location, LocationInput};
pub use report::{InventoryReport, IssueReport, ItemMovement};
pub use user::{CreateUser, LoginRequest, Role, User, UserResponse};

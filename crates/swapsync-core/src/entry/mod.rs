//! Model entries: schema, defaults, and the audit pass.

pub mod audit;
pub mod model;
pub mod table;
pub mod template;

pub use audit::{audit, AuditReport};
pub use model::{EntryField, EntrySlot, ModelEntry};
pub use table::ModelTable;
pub use template::EntryTemplate;

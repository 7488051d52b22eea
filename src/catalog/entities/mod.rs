//! SeaORM entity definitions for the catalog schema, one module per entity.

pub mod drive;
pub mod file;
pub mod media_item;
pub mod media_item_file;
pub mod operation;
pub mod root;
pub mod user_rule;

pub use drive::Entity as Drive;
pub use file::Entity as File;
pub use media_item::Entity as MediaItem;
pub use media_item_file::Entity as MediaItemFile;
pub use operation::Entity as Operation;
pub use root::Entity as Root;
pub use user_rule::Entity as UserRule;

pub use drive::ActiveModel as DriveActive;
pub use file::ActiveModel as FileActive;
pub use media_item::ActiveModel as MediaItemActive;
pub use media_item_file::ActiveModel as MediaItemFileActive;
pub use operation::ActiveModel as OperationActive;
pub use root::ActiveModel as RootActive;
pub use user_rule::ActiveModel as UserRuleActive;

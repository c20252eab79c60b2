pub mod error;
pub mod history;
pub mod keyed_lock;
pub mod menus;
pub mod models;
pub mod pagination;
pub mod snapshot;

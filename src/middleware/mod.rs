pub mod access_gate;

pub use access_gate::{
    access_gate, authenticate, require_admin, require_self_or_admin, AccountDirectory, CurrentUser,
};

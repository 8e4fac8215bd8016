// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod access;
pub mod edit;
pub mod ids;
pub mod model;
pub mod overlay;
pub mod state;
pub mod view;
mod wire;

pub use access::*;
pub use edit::*;
pub use ids::*;
pub use model::*;
pub use overlay::*;
pub use state::*;
pub use view::*;

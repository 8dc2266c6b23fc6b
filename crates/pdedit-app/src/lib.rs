// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod cash;
pub mod grid;
pub mod ids;
pub mod model;
pub mod money;
pub mod navigation;
pub mod state;
pub mod summary;
pub mod workbench;

pub use cash::*;
pub use grid::*;
pub use ids::*;
pub use model::*;
pub use navigation::*;
pub use state::*;
pub use summary::*;
pub use workbench::*;

// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod chart;
pub mod controls;
pub mod fetch;
pub mod ids;
pub mod model;
pub mod options;
pub mod query;
pub mod state;
pub mod table;
pub mod widget;

pub use chart::*;
pub use controls::*;
pub use fetch::*;
pub use ids::*;
pub use model::*;
pub use options::*;
pub use query::*;
pub use state::*;
pub use table::*;
pub use widget::*;

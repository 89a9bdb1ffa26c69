/// Data layer: core types, loading, column handling and numeric coercion.
///
/// Architecture:
/// ```text
///   raw CSV bytes
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse text → Table (typed cells)
///   └──────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ normalize  │  trim + lower-case column names, reject collisions
///   └───────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  select   │  requested names → projected sub-Table
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  coerce to f64, drop incomplete rows → NumericMatrix + row map
///   └──────────┘
/// ```

pub mod filter;
pub mod loader;
pub mod model;
pub mod normalize;
pub mod select;

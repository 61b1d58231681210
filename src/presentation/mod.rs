// Presentation layer - Static page output
pub mod renderer;

// Domain layer - Records and the rules derived from them
pub mod classification;
pub mod curation;
pub mod dashboard;

//! autovision - Self-driving image-classification pipeline with live run
//! observability and gradient-weighted prediction explanations

pub mod collaborators;
pub mod explain;
pub mod feed;
pub mod http;
pub mod observability;
pub mod pipeline;
pub mod registry;

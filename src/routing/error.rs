use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoutingError {
    #[error("variant set is empty")]
    EmptyVariantSet,

    #[error("variant identifier at position {index} is blank")]
    BlankVariant { index: usize },
}

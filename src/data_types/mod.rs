/// Repair-pathway class labels
pub mod indel_class;
/// Long-format, classified, and aggregated row types
pub mod records;

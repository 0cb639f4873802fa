/// Identity of the driver and database behind a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseMetadata {
    pub driver_name: String,
    /// Version of the driver module, i.e. of this crate.
    pub driver_version: String,
    pub product_name: String,
    pub product_version: String,
}

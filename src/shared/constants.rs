//! Contract-level constants: error descriptions, headers, storage naming.
//!
//! The description strings are part of the wire contract and asserted by
//! clients; change them only together with the API consumers.

/// Returned when the business unit field fails schema validation.
pub const EMPTY_BUSINESS_UNIT: &str = "Business Unit should not be null or empty";

/// Returned when the attribute list is present but empty.
pub const ATTRIBUTE_VALIDATION: &str = "Attribute should not be empty";

/// Returned when any attribute is missing its key or value.
pub const ATTRIBUTE_VALIDATION_KEY_VALUE: &str = "Attribute should contain both key and value";

/// Returned when the named business unit does not exist.
pub const BUSINESS_UNIT_INVALID: &str = "Invalid business unit";

/// Returned when a blob with the same name already exists in the batch.
pub const FILE_ALREADY_EXIST: &str = "File already exist in the batch";

/// Returned when the filename is empty or contains illegal characters.
pub const INVALID_FILE_NAME: &str = "Invalid File Name";

/// Returned when the response assembled for a batch carries an expiry in
/// the past even though the earlier batch-id check passed.
pub const EXPIRY_DATE_IN_PAST: &str = "Expiry date should be greater than current date";

/// Returned when the X-Content-Size header is missing or not numeric.
pub const CONTENT_SIZE_REQUIRED: &str = "X-Content-Size header is required and must be numeric";

/// Default MIME type when the X-MIME-Type header is absent.
pub const APPLICATION_OCTET_STREAM: &str = "application/octet-stream";

/// Header carrying the MIME type of an uploaded file.
pub const HEADER_MIME_TYPE: &str = "x-mime-type";

/// Header carrying the declared size in bytes of an uploaded file.
pub const HEADER_CONTENT_SIZE: &str = "x-content-size";

/// Suffix appended to a batch id to form its storage container name.
pub const CONTAINER_SUFFIX: &str = "-container";

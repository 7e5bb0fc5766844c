/// Opaque per-submission job identifier (a UUID v4 string on the wire).
pub type JobId = String;

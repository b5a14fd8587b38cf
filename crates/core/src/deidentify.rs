//! Best-effort de-identification of JSON documents.
//!
//! Keys are matched case-insensitively against a fixed deny-list and dropped
//! at every depth. Only exact key names are caught: a field called
//! `patientFullName` survives unless it is listed. This is a filter applied
//! before sharing data with an external model, not a certified anonymization.

use serde_json::{Map, Value as JsonValue};

/// Lowercased keys removed from any object in the tree
pub const DENY_LIST: &[&str] = &[
    // names
    "name",
    "names",
    "firstname",
    "first_name",
    "lastname",
    "last_name",
    "middlename",
    "fullname",
    "full_name",
    "givenname",
    "given",
    "familyname",
    "family",
    "patientname",
    "patient_name",
    // identifiers
    "id",
    "identifier",
    "identifiers",
    "patientid",
    "patient_id",
    "mrn",
    "medicalrecordnumber",
    "medical_record_number",
    "accountnumber",
    "insuranceid",
    "memberid",
    // dates of birth
    "dob",
    "birthdate",
    "birth_date",
    "dateofbirth",
    "date_of_birth",
    // street-level address
    "address",
    "streetaddress",
    "street_address",
    "street",
    "addressline",
    "addressline1",
    "addressline2",
    "address1",
    "address2",
    "line",
    // contact details
    "phone",
    "phonenumber",
    "phone_number",
    "telephone",
    "telecom",
    "mobile",
    "fax",
    "email",
    "emailaddress",
    "contact",
    // government identifiers
    "ssn",
    "socialsecuritynumber",
    "social_security_number",
    // biometric and image data
    "photo",
    "image",
    "picture",
    "biometric",
    "biometrics",
    "fingerprint",
    "faceimage",
];

/// Whether a key is removed by [`deidentify`]
pub fn is_denied(key: &str) -> bool {
    let lowered = key.to_lowercase();
    DENY_LIST.contains(&lowered.as_str())
}

/// Return a copy of `value` with every deny-listed key removed.
///
/// Arrays keep their length and order; scalars are copied as-is.
pub fn deidentify(value: &JsonValue) -> JsonValue {
    match value {
        JsonValue::Object(map) => JsonValue::Object(deidentify_object(map)),
        JsonValue::Array(items) => JsonValue::Array(items.iter().map(deidentify).collect()),
        scalar => scalar.clone(),
    }
}

fn deidentify_object(map: &Map<String, JsonValue>) -> Map<String, JsonValue> {
    map.iter()
        .filter(|(key, _)| !is_denied(key))
        .map(|(key, value)| (key.clone(), deidentify(value)))
        .collect()
}

use json_patch::Patch;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::PatchError;

/// Reads an RFC 6902 operation list.
pub fn parse_patch(document: Value) -> Result<Patch, PatchError> {
    if !document.is_array() {
        return Err(PatchError::Malformed(
            "a patch document must be an array of operations".to_string(),
        ));
    }
    serde_json::from_value(document).map_err(|e| PatchError::Malformed(e.to_string()))
}

/// Applies `patch` to a snapshot of `target` and reads the result back as `U`.
///
/// `target` itself is never modified. Either every operation applies or the
/// call fails with [`PatchError::Application`].
pub fn apply_patch_as<T, U>(patch: &Patch, target: &T) -> Result<U, PatchError>
where
    T: Serialize,
    U: DeserializeOwned,
{
    let mut document =
        serde_json::to_value(target).map_err(|e| PatchError::Rehydrate(e.to_string()))?;
    json_patch::patch(&mut document, &patch.0)
        .map_err(|e| PatchError::Application(e.to_string()))?;
    serde_json::from_value(document).map_err(|e| PatchError::Rehydrate(e.to_string()))
}

pub fn apply_patch<T>(patch: &Patch, target: &T) -> Result<T, PatchError>
where
    T: Serialize + DeserializeOwned,
{
    apply_patch_as(patch, target)
}

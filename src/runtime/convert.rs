//! Type-tag conformance checks standing in for `json.get<T>()`.

use serde_json::Value;

/// Whether `value` converts to the target type named by `ty`.
///
/// Unknown type tags accept any value; the target compiler is the authority
/// for those.
pub fn conforms(ty: &str, value: &Value) -> bool {
    let ty = ty.trim();
    if let Some(inner) = ty
        .strip_prefix("std::vector<")
        .and_then(|rest| rest.strip_suffix('>'))
    {
        return value
            .as_array()
            .map(|items| items.iter().all(|item| conforms(inner, item)))
            .unwrap_or(false);
    }
    match ty {
        "bool" => value.is_boolean(),
        "int" | "long" | "long int" | "long long" => value.is_i64(),
        "size_t" | "unsigned int" | "unsigned long" | "unsigned" => value.is_u64(),
        "double" | "float" | "long double" => value.is_number(),
        "std::string" => value.is_string(),
        _ => true,
    }
}

//! Template placeholder validation and substitution.
//!
//! Templates carry `@token` markers that are expanded from the module's
//! identity:
//!
//! | Token | Expansion |
//! |---|---|
//! | `@startIncludeGuard` / `@endIncludeGuard` | `#ifndef`/`#define` and `#endif` on the include guard |
//! | `@startNamespace` / `@endNamespace` | every namespace scope, opened or closed |
//! | `@startNamespaceN` / `@endNamespaceN` | scope `N` only |
//! | `@className` / `@parentClassName` | class names |
//! | `@moduleAutoCode` | generated definitions (source templates, see [`super::source`]) |
//!
//! Validation runs before substitution so a malformed template fails the
//! build instead of rendering unbalanced scopes.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::BTreeMap;

use crate::error::GeneratorError;
use crate::schema::ModuleConfig;

pub const CLASS_NAME: &str = "@className";
pub const PARENT_CLASS_NAME: &str = "@parentClassName";
pub const START_INCLUDE_GUARD: &str = "@startIncludeGuard";
pub const END_INCLUDE_GUARD: &str = "@endIncludeGuard";
pub const START_NAMESPACE: &str = "@startNamespace";
pub const END_NAMESPACE: &str = "@endNamespace";
pub const MODULE_AUTO_CODE: &str = "@moduleAutoCode";

/// Matches both namespace token families; group 2 holds the optional index.
static NAMESPACE_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"@(start|end)Namespace(\d+)?").expect("namespace token regex should be valid")
});

static INDEXED_NAMESPACE_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"@(start|end)Namespace(\d+)").expect("indexed namespace regex should be valid")
});

#[derive(Debug, Default)]
struct NamespaceCounts {
    start: usize,
    end: usize,
    /// Per index: (start, end).
    indexed: BTreeMap<usize, (usize, usize)>,
}

fn count_namespace_tokens(template: &str, template_name: &str) -> Result<NamespaceCounts, GeneratorError> {
    let mut counts = NamespaceCounts::default();
    for caps in NAMESPACE_TOKEN.captures_iter(template) {
        let is_start = &caps[1] == "start";
        match caps.get(2) {
            None if is_start => counts.start += 1,
            None => counts.end += 1,
            Some(index) => {
                // An index too large for usize can never be a valid depth.
                let index = index.as_str().parse::<usize>().map_err(|_| GeneratorError::NamespaceDepth {
                    template: template_name.to_string(),
                    token: caps[0].to_string(),
                    depth: 0,
                })?;
                let entry = counts.indexed.entry(index).or_default();
                if is_start {
                    entry.0 += 1;
                } else {
                    entry.1 += 1;
                }
            }
        }
    }
    Ok(counts)
}

/// Check that a template's placeholders are balanced and usable for `module`.
///
/// # Errors
///
/// - [`GeneratorError::UnbalancedPlaceholder`] when a start/end pair (indexed
///   or not) has different counts
/// - [`GeneratorError::NamespaceDepth`] when an indexed token names a scope
///   the module does not have
/// - [`GeneratorError::DuplicatePlaceholder`] when a singleton appears twice
pub fn validate(template: &str, template_name: &str, module: &ModuleConfig) -> Result<(), GeneratorError> {
    let depth = module.namespace.len();
    let namespaces = count_namespace_tokens(template, template_name)?;

    for (&index, &(start_count, end_count)) in &namespaces.indexed {
        if index >= depth {
            let token = if start_count > 0 {
                format!("{START_NAMESPACE}{index}")
            } else {
                format!("{END_NAMESPACE}{index}")
            };
            return Err(GeneratorError::NamespaceDepth {
                template: template_name.to_string(),
                token,
                depth,
            });
        }
        if start_count != end_count {
            return Err(unbalanced(
                template_name,
                &format!("{START_NAMESPACE}{index}"),
                start_count,
                &format!("{END_NAMESPACE}{index}"),
                end_count,
            ));
        }
    }

    if namespaces.start != namespaces.end {
        return Err(unbalanced(
            template_name,
            START_NAMESPACE,
            namespaces.start,
            END_NAMESPACE,
            namespaces.end,
        ));
    }

    let guard_start = template.matches(START_INCLUDE_GUARD).count();
    let guard_end = template.matches(END_INCLUDE_GUARD).count();
    if guard_start != guard_end {
        return Err(unbalanced(
            template_name,
            START_INCLUDE_GUARD,
            guard_start,
            END_INCLUDE_GUARD,
            guard_end,
        ));
    }

    let singletons = [
        (START_NAMESPACE, namespaces.start),
        (END_NAMESPACE, namespaces.end),
        (START_INCLUDE_GUARD, guard_start),
        (END_INCLUDE_GUARD, guard_end),
        (CLASS_NAME, template.matches(CLASS_NAME).count()),
        (PARENT_CLASS_NAME, template.matches(PARENT_CLASS_NAME).count()),
        (MODULE_AUTO_CODE, template.matches(MODULE_AUTO_CODE).count()),
    ];
    if let Some((token, count)) = singletons.into_iter().find(|(_, count)| *count > 1) {
        return Err(GeneratorError::DuplicatePlaceholder {
            template: template_name.to_string(),
            token: token.to_string(),
            count,
        });
    }
    Ok(())
}

fn unbalanced(template: &str, start: &str, start_count: usize, end: &str, end_count: usize) -> GeneratorError {
    GeneratorError::UnbalancedPlaceholder {
        template: template.to_string(),
        start: start.to_string(),
        start_count,
        end: end.to_string(),
        end_count,
    }
}

fn open_scope(name: &str) -> String {
    format!("namespace {name}\n{{")
}

fn close_scope(name: &str) -> String {
    format!("}} //{name}")
}

/// Expand every placeholder. Call [`validate`] first.
///
/// Replacement order is fixed: include guards, indexed namespace tokens,
/// full namespace sequences, then class names. `@moduleAutoCode` is left in
/// place for the source builder.
pub fn substitute(template: &str, module: &ModuleConfig) -> String {
    let guard = &module.include_guard;
    let mut text = template
        .replace(START_INCLUDE_GUARD, &format!("#ifndef {guard}\n#define {guard}"))
        .replace(END_INCLUDE_GUARD, &format!("#endif // {guard}"));

    text = INDEXED_NAMESPACE_TOKEN
        .replace_all(&text, |caps: &Captures| {
            let scope = caps[2]
                .parse::<usize>()
                .ok()
                .and_then(|index| module.namespace.get(index));
            match (scope, &caps[1]) {
                (Some(name), "start") => open_scope(name),
                (Some(name), _) => close_scope(name),
                (None, _) => caps[0].to_string(),
            }
        })
        .into_owned();

    let opening = module
        .namespace
        .iter()
        .map(|ns| open_scope(ns))
        .collect::<Vec<_>>()
        .join("\n");
    let closing = module
        .namespace
        .iter()
        .rev()
        .map(|ns| close_scope(ns))
        .collect::<Vec<_>>()
        .join("\n");
    text = text
        .replace(START_NAMESPACE, &opening)
        .replace(END_NAMESPACE, &closing);

    text.replace(CLASS_NAME, &module.class_name)
        .replace(PARENT_CLASS_NAME, &module.parent_class_name)
}

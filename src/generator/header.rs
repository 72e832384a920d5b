//! Declaration-side artifact: documented fields and override declarations
//! injected into a `.hpp.base` template.

use askama::Template;

use super::ir::{Declaration, FieldDecl, MethodDecl, Param};
use super::placeholder;
use super::printer::{CppPrinter, Printer};
use crate::error::GeneratorError;
use crate::schema::{
    check_identifiers, conditional_identifier, display_path, field_identifier, ModuleConfig,
    SettingDescriptor, SettingSection,
};
use crate::settings::Dialect;

/// Line marker after which members are injected.
pub const PUBLIC_ANCHOR: &str = "public:";

/// One Doxygen block of the header preamble.
pub struct DocTag {
    pub tag: String,
    pub brief: String,
}

#[derive(Template)]
#[template(path = "header_preamble.hpp.txt", escape = "none")]
struct HeaderPreamble<'a> {
    blocks: &'a [DocTag],
}

/// Namespace, file and directory documentation placed above the template.
pub fn preamble_blocks(module: &ModuleConfig) -> Vec<DocTag> {
    let mut blocks: Vec<DocTag> = module
        .namespace
        .iter()
        .map(|ns| DocTag {
            tag: format!("\\namespace {ns}"),
            brief: format!("Namespace declaration for modules of type: {ns}."),
        })
        .collect();
    blocks.push(DocTag {
        tag: "\\file".to_string(),
        brief: format!("Header file for module: {}.", module.class_name),
    });
    blocks.push(DocTag {
        tag: format!("\\dir {}", module.relative_path),
        brief: format!(
            "Contains code, documentation, and scripts for module: {}.",
            module.class_name
        ),
    });
    blocks
}

fn render_preamble(module: &ModuleConfig) -> Result<String, GeneratorError> {
    let blocks = preamble_blocks(module);
    let rendered = HeaderPreamble { blocks: &blocks }
        .render()
        .map_err(|source| GeneratorError::Render {
            name: "header preamble".to_string(),
            source,
        })?;
    // Normalize to exactly one blank line before the template body
    Ok(format!("{}\n\n", rendered.trim_end()))
}

fn field_doc(setting: &SettingDescriptor, section: SettingSection) -> Vec<String> {
    let brief = if setting.description.trim().is_empty() {
        format!("Setting {}.", display_path(None, &setting.name_path))
    } else {
        setting.description.trim().to_string()
    };
    match section {
        SettingSection::Internal => vec![format!("@brief [Internal Use] {brief}")],
        SettingSection::Termination => vec![format!("@brief [Termination Criterion] {brief}")],
        _ => vec![format!("@brief {brief}")],
    }
}

/// Documented data members for every class-level setting.
///
/// Conditional variables contribute a `double` value field and a
/// `std::string` formula field.
pub fn field_declarations(module: &ModuleConfig) -> Vec<FieldDecl> {
    let mut fields = Vec::new();
    for section in SettingSection::CLASS_FIELDS {
        for setting in module.settings(section) {
            if section == SettingSection::Conditional {
                fields.push(FieldDecl {
                    doc: field_doc(setting, section),
                    ty: "double".to_string(),
                    name: field_identifier(&setting.name_path),
                });
                fields.push(FieldDecl {
                    doc: vec![format!(
                        "@brief [Conditional Variable Reference] {}",
                        setting.description.trim()
                    )
                    .trim_end()
                    .to_string()],
                    ty: "std::string".to_string(),
                    name: conditional_identifier(&setting.name_path),
                });
            } else {
                fields.push(FieldDecl {
                    doc: field_doc(setting, section),
                    ty: setting.ty.clone(),
                    name: field_identifier(&setting.name_path),
                });
            }
        }
    }
    fields
}

fn method(doc: &[&str], ret: &str, name: &str, params: Vec<Param>) -> MethodDecl {
    MethodDecl {
        doc: doc.iter().map(|line| line.to_string()).collect(),
        ret: ret.to_string(),
        name: name.to_string(),
        params,
        overrides: true,
    }
}

/// Override declarations, selected by which schema sections are present.
pub fn method_declarations(module: &ModuleConfig, dialect: &Dialect) -> Vec<MethodDecl> {
    let json_ref = format!("{}&", dialect.json_type);
    let mut methods = Vec::new();

    if module.has_section(SettingSection::Termination) {
        methods.push(method(
            &[
                "@brief Determines whether the module can trigger termination of an experiment run.",
                "@return True, if it should trigger termination; false, otherwise.",
            ],
            "bool",
            "checkTermination",
            Vec::new(),
        ));
    }
    methods.push(method(
        &[
            "@brief Obtains the entire current state and configuration of the module.",
            "@param js JSON object onto which to save the serialized state of the module.",
        ],
        "void",
        "getConfiguration",
        vec![Param::new(json_ref.as_str(), "js")],
    ));
    methods.push(method(
        &[
            "@brief Sets the entire state and configuration of the module, given a JSON object.",
            "@param js JSON object from which to deserialize the state of the module.",
        ],
        "void",
        "setConfiguration",
        vec![Param::new(json_ref.as_str(), "js")],
    ));
    methods.push(method(
        &[
            "@brief Applies the module's default configuration upon its creation.",
            "@param js JSON object containing user configuration. The defaults will not override any currently defined settings.",
        ],
        "void",
        "applyModuleDefaults",
        vec![Param::new(json_ref.as_str(), "js")],
    ));
    methods.push(method(
        &["@brief Applies the module's default variable configuration to each variable in the Experiment upon creation."],
        "void",
        "applyVariableDefaults",
        Vec::new(),
    ));
    if module.has_section(SettingSection::Operations) {
        methods.push(method(
            &[
                "@brief Runs the operation specified on the given sample. It checks recursively whether the function was found by the current module or its parents.",
                "@param sample Sample to operate on. Should contain in the 'Operation' field an operation accepted by this module or its parents.",
                "@param operation Should specify an operation type accepted by this module or its parents.",
                "@return True, if operation found and executed; false, otherwise.",
            ],
            "bool",
            "runOperation",
            vec![
                Param::new("std::string", "operation"),
                Param::new(format!("{}&", dialect.sample_type()), "sample"),
            ],
        ));
    }
    if module.has_section(SettingSection::Conditional) {
        methods.push(method(
            &[
                "@brief Retrieves the pointer of a conditional value of a distribution property.",
                "@param property Name of the property to find.",
                "@return The pointer to the property.",
            ],
            "double*",
            "getPropertyPointer",
            vec![Param::new("const std::string&", "property")],
        ));
    }
    methods
}

/// Insert `block` on the line after the first line containing `public:`.
///
/// # Errors
///
/// [`GeneratorError::MissingPublicAnchor`] when no such line exists.
pub fn inject_after_public(template: &str, template_name: &str, block: &str) -> Result<String, GeneratorError> {
    let anchor = template
        .find(PUBLIC_ANCHOR)
        .ok_or_else(|| GeneratorError::MissingPublicAnchor {
            template: template_name.to_string(),
        })?;
    let line_end = template[anchor..]
        .find('\n')
        .map(|offset| anchor + offset + 1)
        .unwrap_or(template.len());

    let mut out = String::with_capacity(template.len() + block.len() + 1);
    out.push_str(&template[..line_end]);
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(block);
    out.push_str(&template[line_end..]);
    Ok(out)
}

/// Insert a class comment before the first line that starts with `class`.
fn insert_class_comment(template: &str, comment: &str) -> String {
    let mut offset = 0;
    for line in template.split_inclusive('\n') {
        // Same line the schema loader reads the class identity from
        if line.contains("class") && line.contains("public") {
            return format!("{}{comment}{}", &template[..offset], &template[offset..]);
        }
        offset += line.len();
    }
    template.to_string()
}

/// Render the header for `module` from its `.hpp.base` template.
///
/// Output is the Doxygen preamble followed by the template with a class
/// comment and the injected members. Placeholders are expanded in the
/// template only, so descriptor text is emitted verbatim.
pub fn build_header(
    module: &ModuleConfig,
    template: &str,
    template_name: &str,
    dialect: &Dialect,
) -> Result<String, GeneratorError> {
    check_identifiers(module)?;
    placeholder::validate(template, template_name, module)?;

    let printer = CppPrinter;
    let mut members: Vec<Declaration> = field_declarations(module)
        .into_iter()
        .map(Declaration::Field)
        .collect();
    members.extend(
        method_declarations(module, dialect)
            .into_iter()
            .map(Declaration::Method),
    );
    let block: String = members.iter().map(|d| printer.declaration(d, 1)).collect();

    let substituted = placeholder::substitute(template, module);
    let with_members = inject_after_public(&substituted, template_name, &block)?;
    let class_comment = printer.declaration(
        &Declaration::Doc(vec![format!(
            "@brief Class declaration for module: {}.",
            module.class_name
        )]),
        0,
    );
    let body = insert_class_comment(&with_members, &class_comment);

    let mut text = render_preamble(module)?;
    text.push_str(&body);
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = "\
#pragma once
@startNamespace
class CMAES : public Optimizer
{
  public:
  void runGeneration() override;
};
@endNamespace
";

    fn cmaes() -> ModuleConfig {
        ModuleConfig::new("CMAES", "CMAES", "Optimizer")
            .with_namespace(&["korali", "solver"])
            .with_section(
                SettingSection::Configuration,
                vec![SettingDescriptor::new(&["Population Size"], "int")
                    .with_description("Specifies the number of samples to evaluate per generation.")],
            )
            .with_compatible_solvers(&[])
    }

    #[test]
    fn test_header_contains_field_and_declarations() {
        let out = build_header(&cmaes(), TEMPLATE, "CMAES.hpp.base", &Dialect::default()).unwrap();
        assert!(out.contains("  int _populationSize;\n"));
        assert!(out.contains("  * @brief Specifies the number of samples to evaluate per generation.\n"));
        assert!(out.contains("  void setConfiguration(knlohmann::json& js) override;\n"));
        assert!(out.contains("  void getConfiguration(knlohmann::json& js) override;\n"));
        assert!(out.contains("  void applyModuleDefaults(knlohmann::json& js) override;\n"));
        assert!(out.contains("  void applyVariableDefaults() override;\n"));
        assert!(!out.contains("checkTermination"));
        assert!(!out.contains("runOperation"));
        assert!(!out.contains("getPropertyPointer"));
    }

    #[test]
    fn test_header_layout_order() {
        let out = build_header(&cmaes(), TEMPLATE, "CMAES.hpp.base", &Dialect::default()).unwrap();
        let ns_doc = out.find("/** \\namespace korali").unwrap();
        let file_doc = out.find("/** \\file").unwrap();
        let dir_doc = out.find("/** \\dir CMAES").unwrap();
        let class_doc = out.find("* @brief Class declaration for module: CMAES.").unwrap();
        let class_line = out.find("class CMAES : public Optimizer").unwrap();
        let public = out.find("public:").unwrap();
        let field = out.find("int _populationSize;").unwrap();
        let template_member = out.find("void runGeneration() override;").unwrap();
        assert!(ns_doc < file_doc && file_doc < dir_doc && dir_doc < class_doc);
        assert!(class_doc < class_line && public < field && field < template_member);
        // Namespaces were substituted
        assert!(out.contains("namespace korali\n{\nnamespace solver\n{\n"));
        assert!(out.contains("} //solver\n} //korali\n"));
    }

    #[test]
    fn test_conditional_variables_produce_two_fields() {
        let module = ModuleConfig::new("Normal", "Normal", "Univariate")
            .with_namespace(&["korali", "distribution", "univariate"])
            .with_section(
                SettingSection::Conditional,
                vec![SettingDescriptor::new(&["Mean"], "double").with_description("Mean of the distribution.")],
            );
        let template = "class Normal : public Univariate\n{\n  public:\n};\n";
        let out = build_header(&module, template, "Normal.hpp.base", &Dialect::default()).unwrap();
        assert!(out.contains("  double _mean;\n"));
        assert!(out.contains("  std::string _meanConditional;\n"));
        assert!(out.contains("  double* getPropertyPointer(const std::string& property) override;\n"));
    }

    #[test]
    fn test_optional_declarations() {
        let module = cmaes()
            .with_section(
                SettingSection::Termination,
                vec![SettingDescriptor::new(&["Max Generations"], "size_t")
                    .with_criteria("_k->_currentGeneration > _maxGenerations")],
            )
            .with_section(
                SettingSection::Operations,
                vec![SettingDescriptor::new(&["Evaluate"], "").with_function("evaluate")],
            );
        let out = build_header(&module, TEMPLATE, "CMAES.hpp.base", &Dialect::default()).unwrap();
        assert!(out.contains("  bool checkTermination() override;\n"));
        assert!(out.contains("  bool runOperation(std::string operation, korali::Sample& sample) override;\n"));
        assert!(out.contains("  size_t _maxGenerations;\n"));
        assert!(out.contains("@brief [Termination Criterion]"));
    }

    #[test]
    fn test_missing_public_anchor_is_fatal() {
        let template = "class CMAES : Optimizer\n{\n};\n";
        let err = build_header(&cmaes(), template, "CMAES.hpp.base", &Dialect::default()).unwrap_err();
        assert!(matches!(err, GeneratorError::MissingPublicAnchor { .. }));
    }

    #[test]
    fn test_inject_after_public_at_end_of_file() {
        let out = inject_after_public("  public:", "t", "  int _x;\n").unwrap();
        assert_eq!(out, "  public:\n  int _x;\n");
    }

    #[test]
    fn test_descriptor_text_is_not_expanded_or_left_unterminated() {
        let module = cmaes().with_section(
            SettingSection::Internal,
            vec![SettingDescriptor::new(&["Scale"], "double")
                .with_description("Ratio */ int broken; /* of @endNamespace and @className")],
        );
        let out = build_header(&module, TEMPLATE, "CMAES.hpp.base", &Dialect::default()).unwrap();
        assert!(out.contains(
            "  * @brief [Internal Use] Ratio * / int broken; /* of @endNamespace and @className\n"
        ));
        assert!(!out.contains("Ratio */"));
        // Only the template's own closing sequence was expanded
        assert_eq!(out.matches("} //korali").count(), 1);
    }

    #[test]
    fn test_class_comment_skips_forward_declarations() {
        let template = "\
@startNamespace
class Sample;
class CMAES : public Optimizer
{
  public:
};
@endNamespace
";
        let out = build_header(&cmaes(), template, "CMAES.hpp.base", &Dialect::default()).unwrap();
        let comment = "/**\n* @brief Class declaration for module: CMAES.\n*/\nclass CMAES : public Optimizer";
        assert!(out.contains(comment));
        assert!(out.contains("{\nclass Sample;\n/**\n* @brief Class declaration"));
    }

    #[test]
    fn test_header_is_deterministic() {
        let module = cmaes();
        let first = build_header(&module, TEMPLATE, "CMAES.hpp.base", &Dialect::default()).unwrap();
        let second = build_header(&module, TEMPLATE, "CMAES.hpp.base", &Dialect::default()).unwrap();
        assert_eq!(first, second);
    }
}

//! Definition-side artifact: method bodies generated for a `.cpp.base` template.
//!
//! Every body is built as IR and printed by [`CppPrinter`]. Runtime failures
//! are emitted as calls to the dialect's error macro with a message naming
//! the module and the full key path (`["Solver"]["Population Size"]`).
//!
//! Definitions replace the `@moduleAutoCode` token when the template has one
//! (names qualified by class only); otherwise they are appended after the
//! template with fully namespace-qualified names.

use std::iter;

use super::ir::{Declaration, Expr, FunctionDef, Param, Stmt};
use super::placeholder::{self, MODULE_AUTO_CODE};
use super::printer::{CppPrinter, Printer};
use crate::error::GeneratorError;
use crate::schema::{
    check_identifiers, conditional_identifier, display_path, field_identifier, ModuleConfig,
    SettingDescriptor, SettingSection, TypeFamily,
};
use crate::settings::Dialect;

/// Escape text destined for a printf-style format string.
fn format_literal(text: &str) -> String {
    text.replace('%', "%%")
}

/// Human-readable key path plus the printf arguments it needs.
#[derive(Debug, Clone)]
struct DiagPath {
    text: String,
    args: Vec<Expr>,
}

/// Where one setting is read from and stored to.
#[derive(Debug, Clone)]
struct Slot {
    /// JSON object holding the setting.
    json: Expr,
    /// Generated field receiving the value.
    field: Expr,
    path: Vec<String>,
    diag: DiagPath,
}

impl Slot {
    fn value(&self) -> Expr {
        self.json.clone().path(&self.path)
    }

    fn json_call(&self, function: &str) -> Expr {
        Expr::call(
            function,
            iter::once(self.json.clone())
                .chain(self.path.iter().map(|key| Expr::str(key.as_str())))
                .collect(),
        )
    }

    fn is_defined(&self) -> Expr {
        self.json_call("isDefined")
    }

    fn erase(&self) -> Stmt {
        Stmt::expr(self.json_call("eraseValue"))
    }
}

struct SourceBuilder<'a> {
    module: &'a ModuleConfig,
    dialect: &'a Dialect,
    category: Option<String>,
    /// Class qualifier used at definition sites.
    qualifier: String,
}

impl<'a> SourceBuilder<'a> {
    fn new(module: &'a ModuleConfig, dialect: &'a Dialect, qualifier: String) -> Self {
        SourceBuilder {
            module,
            dialect,
            category: module.category_key(),
            qualifier,
        }
    }

    fn handle(&self) -> Expr {
        Expr::ident(self.dialect.experiment_handle.as_str())
    }

    fn json_ref(&self) -> String {
        format!("{}&", self.dialect.json_type)
    }

    fn class_literal(&self) -> String {
        format_literal(&self.module.class_name)
    }

    fn fatal(&self, message: String, args: Vec<Expr>) -> Stmt {
        Stmt::expr(Expr::call(
            self.dialect.error_macro.as_str(),
            iter::once(Expr::str(message)).chain(args).collect(),
        ))
    }

    fn parent_call(&self, method: &str, args: Vec<Expr>) -> Option<Expr> {
        self.module.has_parent().then(|| {
            Expr::call(
                format!("{}::{method}", self.module.parent_class_name),
                args,
            )
        })
    }

    fn function(&self, ret: &str, name: &str, params: Vec<Param>, body: Vec<Stmt>) -> Declaration {
        Declaration::Function(FunctionDef {
            ret: ret.to_string(),
            name: format!("{}::{name}", self.qualifier),
            params,
            body,
        })
    }

    fn class_slot(&self, setting: &SettingDescriptor) -> Slot {
        Slot {
            json: Expr::ident("js"),
            field: Expr::ident(field_identifier(&setting.name_path)),
            path: setting.name_path.clone(),
            diag: DiagPath {
                text: format_literal(&display_path(self.category.as_deref(), &setting.name_path)),
                args: Vec::new(),
            },
        }
    }

    /// `_k->_js["Variables"][i]`
    fn variables_json(&self) -> Expr {
        self.handle().arrow("_js").key("Variables")
    }

    fn variable_slot(&self, setting: &SettingDescriptor) -> Slot {
        Slot {
            json: self.variables_json().index(Expr::ident("i")),
            field: self
                .handle()
                .arrow("_variables")
                .index(Expr::ident("i"))
                .arrow(field_identifier(&setting.name_path)),
            path: setting.name_path.clone(),
            diag: DiagPath {
                text: format!(
                    "[\"Variables\"][%zu]{}",
                    format_literal(&display_path(None, &setting.name_path))
                ),
                args: vec![Expr::ident("i")],
            },
        }
    }

    /// `if (isDefined(_k->_js.getJson(), "Variables"))`
    fn variables_defined(&self) -> Expr {
        Expr::call(
            "isDefined",
            vec![
                self.handle().arrow("_js").method("getJson", vec![]),
                Expr::str("Variables"),
            ],
        )
    }

    fn missing_setting(&self, slot: &Slot) -> Stmt {
        self.fatal(
            format!(
                " + No value provided for mandatory setting: {} required by {}.\n",
                slot.diag.text,
                self.class_literal()
            ),
            slot.diag.args.clone(),
        )
    }

    fn conversion_failure(&self, slot: &Slot, detail: &str, extra: Vec<Expr>) -> Stmt {
        self.fatal(
            format!(
                " + Object: [ {} ] \n + Key:    {}\n{detail}",
                self.class_literal(),
                slot.diag.text
            ),
            slot.diag.args.iter().cloned().chain(extra).collect(),
        )
    }

    /// Instantiate a module from `value` through the registry and configure it.
    fn configure_module(&self, target: Expr, value: Expr, pointer: &str, recursive: bool) -> Vec<Stmt> {
        let created = Expr::dynamic_cast(
            pointer,
            Expr::call(self.dialect.module_factory(), vec![value.clone(), self.handle()]),
        );
        let mut stmts = vec![Stmt::expr(target.clone().assign(created))];
        if recursive {
            stmts.push(Stmt::expr(target.clone().arrow_call("applyVariableDefaults", vec![])));
            stmts.push(Stmt::expr(target.clone().arrow_call("applyModuleDefaults", vec![value.clone()])));
            stmts.push(Stmt::expr(target.arrow_call("setConfiguration", vec![value])));
        }
        stmts
    }

    fn is_experiment_pointer(&self, pointer: &str) -> bool {
        pointer.trim_end_matches('*').trim() == format!("{}::Experiment", self.dialect.root_namespace)
    }

    /// Conversion statements for a present value, dispatched on the type family.
    fn read_value(&self, setting: &SettingDescriptor, slot: &Slot) -> Vec<Stmt> {
        let value = slot.value();
        match TypeFamily::classify(&setting.ty, &self.dialect.root_namespace) {
            TypeFamily::Sample => vec![Stmt::expr(slot.field.clone().assign(value))],
            TypeFamily::ModuleVector { element } => {
                let recursive = !self.is_experiment_pointer(&element);
                let item = slot.field.clone().index(Expr::ident("j"));
                vec![
                    Stmt::expr(
                        slot.field
                            .clone()
                            .method("resize", vec![value.clone().method("size", vec![])]),
                    ),
                    Stmt::for_each(
                        "j",
                        value.clone().method("size", vec![]),
                        self.configure_module(item, value.index(Expr::ident("j")), &element, recursive),
                    ),
                ]
            }
            TypeFamily::Module {
                is_experiment,
                is_solver,
            } => {
                let stmts = self.configure_module(slot.field.clone(), value, setting.ty.trim(), !is_experiment);
                if is_solver {
                    // A running experiment keeps its live solver
                    let uninitialized = self
                        .handle()
                        .arrow("_isInitialized")
                        .equals(Expr::raw("false"));
                    vec![Stmt::if_then(uninitialized, stmts)]
                } else {
                    stmts
                }
            }
            TypeFamily::RandomGenerator => vec![Stmt::expr(slot.field.clone().assign(Expr::call(
                "setRange",
                vec![value.method("get<std::string>", vec![])],
            )))],
            TypeFamily::Plain => {
                let mut stmts = vec![Stmt::Try {
                    body: vec![Stmt::expr(
                        slot.field
                            .clone()
                            .assign(value.method(format!("get<{}>", setting.ty.trim()), vec![])),
                    )],
                    catch: "const std::exception& e".to_string(),
                    handler: vec![self.conversion_failure(
                        slot,
                        "%s",
                        vec![Expr::ident("e").method("what", vec![])],
                    )],
                }];
                if !setting.options.is_empty() {
                    stmts.push(self.option_check(setting, slot));
                }
                stmts
            }
        }
    }

    fn option_check(&self, setting: &SettingDescriptor, slot: &Slot) -> Stmt {
        let mut body = vec![Stmt::let_("bool", "validOption", Expr::raw("false"))];
        for option in setting.option_values() {
            body.push(Stmt::if_then(
                slot.field.clone().equals(Expr::str(option)),
                vec![Stmt::expr(Expr::ident("validOption").assign(Expr::raw("true")))],
            ));
        }
        let message = format!(
            " + Unrecognized value (%s) provided for mandatory setting: {} required by {}.\n",
            slot.diag.text,
            self.class_literal()
        );
        body.push(Stmt::if_then(
            Expr::ident("validOption").equals(Expr::raw("false")),
            vec![self.fatal(
                message,
                iter::once(slot.field.clone().method("c_str", vec![]))
                    .chain(slot.diag.args.clone())
                    .collect(),
            )],
        ));
        Stmt::Block(body)
    }

    fn read_conditional(&self, setting: &SettingDescriptor, slot: &Slot) -> Vec<Stmt> {
        let value = slot.value();
        let formula = Expr::ident(conditional_identifier(&setting.name_path));
        vec![Stmt::if_else(
            value.clone().method("is_number", vec![]),
            vec![
                Stmt::expr(slot.field.clone().assign(value.clone().method("get<double>", vec![]))),
                Stmt::expr(formula.clone().assign(Expr::str(""))),
            ],
            vec![Stmt::if_else(
                value.clone().method("is_string", vec![]),
                vec![
                    Stmt::expr(formula.assign(value.method("get<std::string>", vec![]))),
                    Stmt::expr(Expr::ident("_hasConditionalVariables").assign(Expr::raw("true"))),
                ],
                vec![self.conversion_failure(
                    slot,
                    " value must be a number or a formula string.\n",
                    Vec::new(),
                )],
            )],
        )]
    }

    /// Guarded read, erase and (for mandatory sections) missing-value error.
    fn consume(&self, setting: &SettingDescriptor, section: SettingSection, slot: &Slot) -> Stmt {
        let mut then = if section == SettingSection::Conditional {
            self.read_conditional(setting, slot)
        } else {
            self.read_value(setting, slot)
        };
        then.push(slot.erase());

        let otherwise = if section.is_mandatory() {
            vec![self.missing_setting(slot)]
        } else {
            Vec::new()
        };
        Stmt::if_else(slot.is_defined(), then, otherwise)
    }

    fn compatible_solver_check(&self) -> Option<Stmt> {
        let solvers = self.module.compatible_solvers();
        if solvers.is_empty() {
            return None;
        }
        let declared = self.handle().arrow("_js").key("Solver").key("Type");
        let solver_name = Expr::ident("solverName");
        let mut body = vec![
            Stmt::let_("bool", "detectedCompatibleSolver", Expr::raw("false")),
            Stmt::let_(
                "std::string",
                "solverName",
                Expr::call("toLower", vec![declared.clone()]),
            ),
            Stmt::expr(solver_name.clone().method(
                "erase",
                vec![
                    Expr::call(
                        "remove_if",
                        vec![
                            solver_name.clone().method("begin", vec![]),
                            solver_name.clone().method("end", vec![]),
                            Expr::ident("isspace"),
                        ],
                    ),
                    solver_name.clone().method("end", vec![]),
                ],
            )),
        ];
        for candidate in solvers {
            let normalized: String = candidate
                .chars()
                .filter(|c| !c.is_whitespace())
                .flat_map(char::to_lowercase)
                .collect();
            body.push(Stmt::if_then(
                solver_name
                    .clone()
                    .method("rfind", vec![Expr::str(normalized), Expr::raw("0")])
                    .equals(Expr::raw("0")),
                vec![Stmt::expr(
                    Expr::ident("detectedCompatibleSolver").assign(Expr::raw("true")),
                )],
            ));
        }
        body.push(Stmt::if_then(
            Expr::ident("detectedCompatibleSolver").equals(Expr::raw("false")),
            vec![self.fatal(
                format!(
                    " + Specified solver (%s) is not compatible with problem of type: {}\n",
                    format_literal(&self.module.module_type)
                ),
                vec![declared
                    .method("dump", vec![Expr::raw("1")])
                    .method("c_str", vec![])],
            )],
        ));
        Some(Stmt::Block(body))
    }

    fn set_configuration(&self) -> Declaration {
        let mut body = Vec::new();
        for section in SettingSection::CONSUME_ORDER {
            for setting in self.module.settings(section) {
                body.push(self.consume(setting, section, &self.class_slot(setting)));
            }
        }

        let variables = self.module.settings(SettingSection::Variables);
        if !variables.is_empty() {
            let per_variable = variables
                .iter()
                .map(|setting| self.consume(setting, SettingSection::Variables, &self.variable_slot(setting)))
                .collect();
            body.push(Stmt::if_then(
                self.variables_defined(),
                vec![Stmt::for_each(
                    "i",
                    self.variables_json().method("size", vec![]),
                    per_variable,
                )],
            ));
        }

        body.extend(self.compatible_solver_check());
        if let Some(parent) = self.parent_call("setConfiguration", vec![Expr::ident("js")]) {
            body.push(Stmt::expr(parent));
        }

        let js = Expr::ident("js");
        body.push(Stmt::expr(
            Expr::ident("_type").assign(Expr::str(self.module.module_type.as_str())),
        ));
        body.push(Stmt::if_then(
            Expr::call("isDefined", vec![js.clone(), Expr::str("Type")]),
            vec![Stmt::expr(Expr::call("eraseValue", vec![js.clone(), Expr::str("Type")]))],
        ));
        body.push(Stmt::if_then(
            Expr::call("isEmpty", vec![js.clone()]).equals(Expr::raw("false")),
            vec![self.fatal(
                format!(
                    " + Unrecognized settings for module: {}: \n%s\n",
                    self.class_literal()
                ),
                vec![js.method("dump", vec![Expr::raw("2")]).method("c_str", vec![])],
            )],
        ));

        self.function(
            "void",
            "setConfiguration",
            vec![Param::new(self.json_ref(), "js")],
            body,
        )
    }

    fn write_value(&self, setting: &SettingDescriptor, slot: &Slot) -> Vec<Stmt> {
        let value = slot.value();
        match TypeFamily::classify(&setting.ty, &self.dialect.root_namespace) {
            TypeFamily::Sample | TypeFamily::Plain => {
                vec![Stmt::expr(value.assign(slot.field.clone()))]
            }
            TypeFamily::ModuleVector { element } => {
                if self.is_experiment_pointer(&element) {
                    return Vec::new();
                }
                vec![Stmt::for_each(
                    "j",
                    slot.field.clone().method("size", vec![]),
                    vec![Stmt::expr(
                        slot.field
                            .clone()
                            .index(Expr::ident("j"))
                            .arrow_call("getConfiguration", vec![value.index(Expr::ident("j"))]),
                    )],
                )]
            }
            TypeFamily::Module { is_experiment, .. } => {
                if is_experiment {
                    return Vec::new();
                }
                vec![Stmt::if_then(
                    slot.field.clone().not_equals(Expr::raw("NULL")),
                    vec![Stmt::expr(
                        slot.field.clone().arrow_call("getConfiguration", vec![value]),
                    )],
                )]
            }
            TypeFamily::RandomGenerator => vec![Stmt::expr(
                value.assign(Expr::call("getRange", vec![slot.field.clone()])),
            )],
        }
    }

    fn get_configuration(&self) -> Declaration {
        let mut body = Vec::new();
        for section in [
            SettingSection::Internal,
            SettingSection::Configuration,
            SettingSection::Termination,
        ] {
            for setting in self.module.settings(section) {
                body.extend(self.write_value(setting, &self.class_slot(setting)));
            }
        }
        for setting in self.module.settings(SettingSection::Conditional) {
            let slot = self.class_slot(setting);
            let formula = Expr::ident(conditional_identifier(&setting.name_path));
            body.push(Stmt::if_else(
                formula.clone().equals(Expr::str("")),
                vec![Stmt::expr(slot.value().assign(slot.field.clone()))],
                vec![Stmt::expr(slot.value().assign(formula))],
            ));
        }

        let variables = self.module.settings(SettingSection::Variables);
        if !variables.is_empty() {
            let per_variable = variables
                .iter()
                .flat_map(|setting| self.write_value(setting, &self.variable_slot(setting)))
                .collect();
            body.push(Stmt::for_each(
                "i",
                self.handle().arrow("_variables").method("size", vec![]),
                per_variable,
            ));
        }

        body.push(Stmt::expr(
            Expr::ident("js").key("Type").assign(Expr::ident("_type")),
        ));
        if let Some(parent) = self.parent_call("getConfiguration", vec![Expr::ident("js")]) {
            body.push(Stmt::expr(parent));
        }

        self.function(
            "void",
            "getConfiguration",
            vec![Param::new(self.json_ref(), "js")],
            body,
        )
    }

    /// `std::string defaultString = "..."; json defaultJs = json::parse(defaultString);`
    fn parse_defaults(&self, defaults: &serde_json::Map<String, serde_json::Value>) -> Vec<Stmt> {
        let literal = serde_json::Value::Object(defaults.clone()).to_string();
        vec![
            Stmt::let_("std::string", "defaultString", Expr::str(literal)),
            Stmt::let_(
                self.dialect.json_type.as_str(),
                "defaultJs",
                Expr::call(
                    format!("{}::parse", self.dialect.json_type),
                    vec![Expr::ident("defaultString")],
                ),
            ),
        ]
    }

    fn apply_module_defaults(&self) -> Declaration {
        let mut body = Vec::new();
        if let Some(defaults) = &self.module.module_defaults {
            body.extend(self.parse_defaults(defaults));
            body.push(Stmt::expr(Expr::call(
                "mergeJson",
                vec![Expr::ident("js"), Expr::ident("defaultJs")],
            )));
        }
        if let Some(parent) = self.parent_call("applyModuleDefaults", vec![Expr::ident("js")]) {
            body.push(Stmt::expr(parent));
        }
        self.function(
            "void",
            "applyModuleDefaults",
            vec![Param::new(self.json_ref(), "js")],
            body,
        )
    }

    fn apply_variable_defaults(&self) -> Declaration {
        let mut body = Vec::new();
        if let Some(defaults) = &self.module.variable_defaults {
            body.extend(self.parse_defaults(defaults));
            body.push(Stmt::if_then(
                self.variables_defined(),
                vec![Stmt::for_each(
                    "i",
                    self.variables_json().method("size", vec![]),
                    vec![Stmt::expr(Expr::call(
                        "mergeJson",
                        vec![
                            self.variables_json().index(Expr::ident("i")),
                            Expr::ident("defaultJs"),
                        ],
                    ))],
                )],
            ));
        }
        if let Some(parent) = self.parent_call("applyVariableDefaults", vec![]) {
            body.push(Stmt::expr(parent));
        }
        self.function("void", "applyVariableDefaults", Vec::new(), body)
    }

    fn check_termination(&self) -> Declaration {
        let mut body = vec![Stmt::let_("bool", "hasFinished", Expr::raw("false"))];
        for setting in self.module.settings(SettingSection::Termination) {
            let Some(criteria) = setting.criteria.as_deref().filter(|c| !c.trim().is_empty()) else {
                continue;
            };
            let field = Expr::ident(field_identifier(&setting.name_path));
            let label = format!(
                "{} = ",
                display_path(self.category.as_deref(), &setting.name_path)
            );
            let message = Expr::str(label)
                .plus(Expr::call("std::to_string", vec![field]))
                .plus(Expr::str("."));
            body.push(Stmt::if_then(
                Expr::raw(criteria.trim()),
                vec![
                    Stmt::expr(Expr::ident("_terminationCriteria").method("push_back", vec![message])),
                    Stmt::expr(Expr::ident("hasFinished").assign(Expr::raw("true"))),
                ],
            ));
        }
        if let Some(parent) = self.parent_call("checkTermination", vec![]) {
            // Both sides are evaluated so every satisfied criterion is recorded
            body.push(Stmt::let_("bool", "parentFinished", parent));
            body.push(Stmt::expr(
                Expr::ident("hasFinished")
                    .assign(Expr::ident("hasFinished").or(Expr::ident("parentFinished"))),
            ));
        }
        body.push(Stmt::ret(Expr::ident("hasFinished")));
        self.function("bool", "checkTermination", Vec::new(), body)
    }

    fn run_operation(&self) -> Declaration {
        let operation = Expr::ident("operation");
        let sample = Expr::ident("sample");
        let mut body = vec![Stmt::let_("bool", "operationDetected", Expr::raw("false"))];
        for op in self.module.settings(SettingSection::Operations) {
            let Some(function) = op.function.as_deref() else {
                continue;
            };
            body.push(Stmt::if_then(
                operation.clone().equals(Expr::str(op.leaf_name())),
                vec![
                    Stmt::expr(Expr::call(function, vec![sample.clone()])),
                    Stmt::ret(Expr::raw("true")),
                ],
            ));
        }
        if let Some(parent) = self.parent_call("runOperation", vec![operation.clone(), sample.clone()]) {
            body.push(Stmt::expr(
                Expr::ident("operationDetected").assign(Expr::ident("operationDetected").or(parent)),
            ));
        }
        body.push(Stmt::if_then(
            Expr::ident("operationDetected").equals(Expr::raw("false")),
            vec![self.fatal(
                format!(
                    " + Operation %s not recognized for module {}.\n",
                    self.class_literal()
                ),
                vec![operation.method("c_str", vec![])],
            )],
        ));
        body.push(Stmt::ret(Expr::ident("operationDetected")));
        self.function(
            "bool",
            "runOperation",
            vec![
                Param::new("std::string", "operation"),
                Param::new(format!("{}&", self.dialect.sample_type()), "sample"),
            ],
            body,
        )
    }

    fn get_property_pointer(&self) -> Declaration {
        let property = Expr::ident("property");
        let mut body: Vec<Stmt> = self
            .module
            .settings(SettingSection::Conditional)
            .iter()
            .map(|setting| {
                Stmt::if_then(
                    property.clone().equals(Expr::str(setting.leaf_name())),
                    vec![Stmt::ret(
                        Expr::ident(field_identifier(&setting.name_path)).address_of(),
                    )],
                )
            })
            .collect();
        body.push(self.fatal(
            format!(
                " + Property %s not recognized for module {}.\n",
                self.class_literal()
            ),
            vec![property.method("c_str", vec![])],
        ));
        body.push(Stmt::ret(Expr::raw("NULL")));
        self.function(
            "double*",
            "getPropertyPointer",
            vec![Param::new("const std::string&", "property")],
            body,
        )
    }

    fn definitions(&self) -> Vec<Declaration> {
        let mut defs = vec![
            self.set_configuration(),
            self.get_configuration(),
            self.apply_module_defaults(),
            self.apply_variable_defaults(),
        ];
        if self.module.has_section(SettingSection::Termination) {
            defs.push(self.check_termination());
        }
        if self.module.has_section(SettingSection::Operations) {
            defs.push(self.run_operation());
        }
        if self.module.has_section(SettingSection::Conditional) {
            defs.push(self.get_property_pointer());
        }
        defs
    }
}

/// Generated method definitions for `module`, as IR.
///
/// `qualifier` prefixes every definition name (`CMAES` or `korali::solver::CMAES`).
pub fn source_definitions(module: &ModuleConfig, dialect: &Dialect, qualifier: &str) -> Vec<Declaration> {
    SourceBuilder::new(module, dialect, qualifier.to_string()).definitions()
}

/// Render the source for `module` from its `.cpp.base` template.
pub fn build_source(
    module: &ModuleConfig,
    template: &str,
    template_name: &str,
    dialect: &Dialect,
) -> Result<String, GeneratorError> {
    check_identifiers(module)?;
    placeholder::validate(template, template_name, module)?;

    let in_place = template.contains(MODULE_AUTO_CODE);
    let qualifier = if in_place {
        module.class_name.clone()
    } else {
        module.qualified_class_name()
    };
    let definitions = source_definitions(module, dialect, &qualifier);
    let code = CppPrinter.declarations(&definitions, 0);

    // Generated code embeds descriptor keys, so expand the template first
    let mut text = placeholder::substitute(template, module);
    if in_place {
        text = text.replacen(MODULE_AUTO_CODE, code.trim_end(), 1);
    } else {
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        text.push('\n');
        text.push_str(&code);
    }
    Ok(text)
}

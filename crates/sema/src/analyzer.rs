//! The two-pass semantic analyzer: declaration discovery, then per-argument
//! validation, producing a [`SemaIr`] stream.

use crate::sema_ir::{SemaArgument, SemaArgumentValue, SemaCommand, SemaIr, Subscript, VarRef};
use crate::symbol_table::{ModelTable, ScopeId, SymbolTable, VarType};
use gta3c_ast::{
    Argument, ArgumentValue, CommandDef, CommandTable, EntityId, LinkedIr, ParamDef, ParamType,
    ParserIr,
};
use gta3c_data_structures::Arena;
use gta3c_interface::{DiagCtxt, DiagnosticKind, FileType, FileTable, Span};
use std::collections::HashSet;

const MAX_TEXT_LABEL_LEN: usize = 7;
const MAX_STRING_LEN: usize = 127;
const RESERVED_TIMER_NAMES: [&str; 2] = ["TIMERA", "TIMERB"];

fn is_open_brace(name: &str) -> bool {
    name == "{"
}

fn is_close_brace(name: &str) -> bool {
    name == "}"
}

/// Splits an identifier's text into a name and an optional bracketed
/// subscript, e.g. `HEALTH[10]` -> (`HEALTH`, Some(`10`)).
fn split_subscript(text: &str) -> (&str, Option<&str>) {
    match text.find('[') {
        Some(pos) => {
            let name = &text[..pos];
            let inner = text[pos + 1..].trim_end_matches(']');
            (name, Some(inner))
        }
        None => (text, None),
    }
}

/// Result of the whole analysis: the populated symbol table and, if no
/// errors were recorded, the validated IR stream.
pub struct AnalysisResult<'a> {
    pub symbols: SymbolTable<'a>,
    pub sema: Option<Vec<&'a SemaIr<'a>>>,
    pub error_count: u32,
}

pub struct Analyzer<'a> {
    arena: &'a Arena,
    commands: &'a CommandTable<'a>,
    models: &'a ModelTable<'a>,
    files: &'a std::cell::RefCell<FileTable<'a>>,
    dcx: &'a DiagCtxt,
    symbols: SymbolTable<'a>,
    error_count: u32,
    seen_script_names: HashSet<&'a str>,
}

impl<'a> Analyzer<'a> {
    pub fn new(
        arena: &'a Arena,
        commands: &'a CommandTable<'a>,
        models: &'a ModelTable<'a>,
        files: &'a std::cell::RefCell<FileTable<'a>>,
        dcx: &'a DiagCtxt,
    ) -> Self {
        Self::with_symbols(arena, commands, models, files, dcx, SymbolTable::new(arena))
    }

    /// Like [`Analyzer::new`], but continues filling an existing symbol
    /// table instead of starting from an empty one. A multi-file compile
    /// shares one symbol table across its files (global variables and
    /// labels are visible from every file in the session), while each file
    /// still gets its own `Analyzer` run over its own `LinkedIr`.
    pub fn with_symbols(
        arena: &'a Arena,
        commands: &'a CommandTable<'a>,
        models: &'a ModelTable<'a>,
        files: &'a std::cell::RefCell<FileTable<'a>>,
        dcx: &'a DiagCtxt,
        symbols: SymbolTable<'a>,
    ) -> Self {
        Self {
            arena,
            commands,
            models,
            files,
            dcx,
            symbols,
            error_count: 0,
            seen_script_names: HashSet::new(),
        }
    }

    fn error(&mut self, span: Span, kind: DiagnosticKind, message: impl Into<String>) {
        self.error_count += 1;
        self.dcx.err(message.into()).span(span).kind(kind).emit();
    }

    pub fn analyze(mut self, input: &LinkedIr<'a>) -> AnalysisResult<'a> {
        self.pass1(input);
        self.check_local_global_collisions();
        let sema_ir = self.pass2(input);
        let sema = if self.error_count == 0 { Some(sema_ir) } else { None };
        AnalysisResult { symbols: self.symbols, sema, error_count: self.error_count }
    }

    // --- Pass 1: declarations -------------------------------------------------

    fn pass1(&mut self, input: &LinkedIr<'a>) {
        let mut current_scope = self.symbols.global_scope();
        let mut pending_labels = Vec::new();
        for node in input.iter() {
            if let Some(label) = node.label {
                let (inserted_label, inserted) =
                    self.symbols.insert_label(label.name, label.span, current_scope);
                if !inserted {
                    self.error(
                        label.span,
                        DiagnosticKind::DuplicateLabel,
                        format!("duplicate label `{}`", label.name),
                    );
                } else {
                    pending_labels.push(inserted_label);
                }
            }
            let Some(cmd) = node.command else { continue };
            if is_open_brace(cmd.name) {
                current_scope = self.symbols.new_scope();
                for label in pending_labels.drain(..) {
                    self.symbols.set_label_scope(label, current_scope);
                }
                continue;
            }
            pending_labels.clear();
            if is_close_brace(cmd.name) {
                current_scope = self.symbols.global_scope();
                continue;
            }
            match cmd.name {
                "VAR_INT" | "VAR_FLOAT" | "VAR_TEXT_LABEL" => {
                    let ty = var_type_of(cmd.name);
                    for arg in cmd.args {
                        self.declare(self.symbols.global_scope(), arg, ty);
                    }
                }
                "LVAR_INT" | "LVAR_FLOAT" | "LVAR_TEXT_LABEL" => {
                    let ty = var_type_of(&cmd.name[1..]);
                    if current_scope == self.symbols.global_scope() {
                        self.error(
                            cmd.span,
                            DiagnosticKind::VarDeclOutsideOfScope,
                            "local variable declared outside of a { ... } scope",
                        );
                        for arg in cmd.args {
                            self.declare(self.symbols.global_scope(), arg, ty);
                        }
                    } else {
                        for arg in cmd.args {
                            self.declare(current_scope, arg, ty);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn declare(&mut self, scope: ScopeId, arg: &Argument<'a>, ty: VarType) {
        let ArgumentValue::Identifier(text) = arg.value else { return };
        let (name, subscript_text) = split_subscript(text);
        let dimensions = match subscript_text {
            None => None,
            Some(text) => match text.parse::<i32>() {
                Ok(n) if n >= 1 => std::num::NonZeroU32::new(n as u32),
                Ok(_) => {
                    self.error(
                        arg.span,
                        DiagnosticKind::VarDeclSubscriptMustBeNonzero,
                        "array size must be a positive integer",
                    );
                    std::num::NonZeroU32::new(1)
                }
                Err(_) => {
                    self.error(
                        arg.span,
                        DiagnosticKind::VarDeclSubscriptMustBeLiteral,
                        "array size must be a literal integer",
                    );
                    std::num::NonZeroU32::new(1)
                }
            },
        };
        self.symbols.insert_variable(scope, name, arg.span, ty, dimensions);
    }

    fn check_local_global_collisions(&mut self) {
        let mut collisions = Vec::new();
        for scope in self.symbols.local_scopes() {
            for var in self.symbols.scope_variables(scope) {
                if self.symbols.global_var(var.name).is_some() {
                    collisions.push((var.name, var.span));
                }
            }
        }
        for (name, span) in collisions {
            self.error(
                span,
                DiagnosticKind::DuplicateVarLvar,
                format!("local variable `{name}` collides with a global variable"),
            );
        }
    }

    // --- Pass 2: checking -------------------------------------------------

    fn pass2(&mut self, input: &LinkedIr<'a>) -> Vec<&'a SemaIr<'a>> {
        // Pass 1 allocated scopes in source order as it crossed each `{`; a
        // second walk re-derives the same `ScopeId`s by counting braces the
        // same way, without re-allocating anything.
        let mut current_scope = self.symbols.global_scope();
        let mut next_local_scope = 1usize;
        let mut out = Vec::new();
        for node in input.iter() {
            if let Some(cmd) = node.command {
                if is_open_brace(cmd.name) {
                    current_scope = ScopeId::from_usize(next_local_scope);
                    next_local_scope += 1;
                    out.push(self.build_sema_ir(node, None));
                    continue;
                }
                if is_close_brace(cmd.name) {
                    current_scope = self.symbols.global_scope();
                    out.push(self.build_sema_ir(node, None));
                    continue;
                }
            }
            let sema_command = node.command.and_then(|cmd| self.check_command(cmd, current_scope));
            out.push(self.build_sema_ir(node, sema_command));
        }
        out
    }

    fn build_sema_ir(
        &self,
        node: &ParserIr<'a>,
        command: Option<SemaCommand<'a>>,
    ) -> &'a SemaIr<'a> {
        let label = node.label.and_then(|l| self.symbols.lookup_label(l.name));
        self.arena.alloc(SemaIr { label, command })
    }

    fn check_command(
        &mut self,
        cmd: gta3c_ast::Command<'a>,
        scope: ScopeId,
    ) -> Option<SemaCommand<'a>> {
        let def = self.resolve_command(cmd, scope)?;

        if def.name == "SCRIPT_NAME" {
            if let Some(ArgumentValue::Identifier(name)) = cmd.args.first().map(|a| a.value) {
                if !self.seen_script_names.insert(name) {
                    self.error(
                        cmd.span,
                        DiagnosticKind::DuplicateScriptName,
                        format!("duplicate script name `{name}`"),
                    );
                }
            }
        }

        if def.name == "START_NEW_SCRIPT" {
            self.check_start_new_script(cmd);
        }

        let min_required =
            def.optional_param_index().unwrap_or(def.params.len());
        if cmd.args.len() < min_required || cmd.args.len() > def.params.len() {
            self.error(
                cmd.span,
                DiagnosticKind::WrongArgumentCount,
                format!(
                    "`{}` expects {} argument(s), found {}",
                    def.name,
                    def.params.len(),
                    cmd.args.len()
                ),
            );
            return None;
        }

        let mut sema_args = Vec::with_capacity(cmd.args.len());
        let mut ok = true;
        for (param, arg) in def.params.iter().zip(cmd.args.iter()) {
            match self.check_argument(param, *arg, scope) {
                Some(value) => sema_args.push(SemaArgument { value, span: arg.span }),
                None => ok = false,
            }
        }
        if !ok {
            return None;
        }

        Some(SemaCommand {
            def,
            not_flag: cmd.not_flag,
            span: cmd.span,
            args: self.arena.alloc_slice_fill_iter(sema_args),
        })
    }

    /// `START_NEW_SCRIPT label [args...]`: the arguments after the label
    /// must match the target script's declared locals, in order, excluding
    /// the reserved timer names.
    fn check_start_new_script(&mut self, cmd: gta3c_ast::Command<'a>) {
        let Some(first) = cmd.args.first() else { return };
        let ArgumentValue::Identifier(name) = first.value else { return };
        let Some(label) = self.symbols.lookup_label(name) else { return };

        let targets: Vec<_> = self
            .symbols
            .scope_variables(label.scope())
            .filter(|v| !RESERVED_TIMER_NAMES.contains(&v.name))
            .collect();
        let supplied = &cmd.args[1..];

        if supplied.len() != targets.len() {
            self.error(
                cmd.span,
                DiagnosticKind::WrongArgumentCount,
                format!(
                    "`START_NEW_SCRIPT` supplies {} argument(s) but `{}` declares {} local(s)",
                    supplied.len(),
                    label.name,
                    targets.len()
                ),
            );
            return;
        }
        for (target, arg) in targets.iter().zip(supplied.iter()) {
            let actual = match arg.value {
                ArgumentValue::Int(_) => Some(VarType::Int),
                ArgumentValue::Float(_) => Some(VarType::Float),
                ArgumentValue::Identifier(text) => {
                    let (var_name, _) = split_subscript(text);
                    self.symbols
                        .lookup_var(var_name, self.symbols.global_scope())
                        .map(|v| v.ty)
                }
                _ => None,
            };
            if actual.is_some_and(|ty| ty != target.ty) {
                self.error(
                    arg.span,
                    DiagnosticKind::WrongVariableType,
                    format!("argument type does not match `{}`'s declared type", target.name),
                );
            }
        }
    }

    fn resolve_command(
        &mut self,
        cmd: gta3c_ast::Command<'a>,
        scope: ScopeId,
    ) -> Option<&'a CommandDef<'a>> {
        if let Some(def) = self.commands.find_command(cmd.name) {
            return Some(def);
        }
        if let Some(alt) = self.commands.find_alternator(cmd.name) {
            for candidate in alt.alternatives() {
                if self.arguments_match_shape(candidate, cmd.args, scope) {
                    return Some(candidate);
                }
            }
            self.error(
                cmd.span,
                DiagnosticKind::UnresolvedOverload,
                format!("no overload of `{}` matches these arguments", cmd.name),
            );
            return None;
        }
        self.error(cmd.span, DiagnosticKind::UnknownCommand, format!("unknown command `{}`", cmd.name));
        None
    }

    /// A cheap, non-diagnosing pre-check used only to pick an alternator
    /// candidate: does each argument *look* like it could satisfy the
    /// corresponding parameter's type?
    fn arguments_match_shape(
        &self,
        candidate: &CommandDef<'a>,
        args: &[Argument<'a>],
        scope: ScopeId,
    ) -> bool {
        if args.len() > candidate.params.len() {
            return false;
        }
        for (param, arg) in candidate.params.iter().zip(args.iter()) {
            let plausible = match (param.ty, arg.value) {
                (ParamType::Int | ParamType::IntOpt, ArgumentValue::Int(_)) => true,
                (ParamType::Float | ParamType::FloatOpt, ArgumentValue::Float(_)) => true,
                (
                    ParamType::VarInt
                    | ParamType::VarFloat
                    | ParamType::VarTextLabel
                    | ParamType::LvarInt
                    | ParamType::LvarFloat
                    | ParamType::LvarTextLabel,
                    ArgumentValue::Identifier(text),
                ) => {
                    let (name, _) = split_subscript(text);
                    self.symbols.lookup_var(name, self.symbols.global_scope()).is_some()
                        || self.symbols.lookup_var(name, scope).is_some()
                }
                (ParamType::Label, ArgumentValue::Identifier(name)) => {
                    self.symbols.lookup_label(name).is_some()
                }
                (ParamType::TextLabel | ParamType::TextLabelOpt, ArgumentValue::Identifier(_)) => {
                    true
                }
                (ParamType::String | ParamType::StringOpt, ArgumentValue::String(_)) => true,
                (ParamType::Object | ParamType::ObjectOpt, ArgumentValue::Identifier(name)) => {
                    self.models.find_model(name).is_some()
                }
                _ => false,
            };
            if !plausible {
                return false;
            }
        }
        true
    }

    fn check_argument(
        &mut self,
        param: &ParamDef,
        arg: Argument<'a>,
        scope: ScopeId,
    ) -> Option<SemaArgumentValue<'a>> {
        use ParamType::*;
        let ty = param.ty;
        match ty {
            Int | IntOpt | InputInt | InputIntOpt => match arg.value {
                ArgumentValue::Int(v) => Some(SemaArgumentValue::Int(v)),
                ArgumentValue::Identifier(name) => {
                    let value = self.resolve_constant_or_var(name, arg, scope)?;
                    self.check_entity_type(&value, param.entity_type, arg.span, false);
                    Some(value)
                }
                _ => {
                    self.error(arg.span, DiagnosticKind::ExpectedInteger, "expected an integer");
                    None
                }
            },
            Float | FloatOpt | InputFloat | InputFloatOpt => match arg.value {
                ArgumentValue::Float(v) => Some(SemaArgumentValue::Float(v)),
                ArgumentValue::Identifier(_) => self.resolve_var_arg(arg, scope, None),
                _ => {
                    self.error(arg.span, DiagnosticKind::ExpectedFloat, "expected a floating-point literal");
                    None
                }
            },
            VarInt | VarIntOpt | LvarInt | LvarIntOpt | VarFloat | VarFloatOpt | LvarFloat
            | LvarFloatOpt | VarTextLabel | VarTextLabelOpt | LvarTextLabel
            | LvarTextLabelOpt => self.resolve_var_arg(arg, scope, Some(var_type_for_param(ty))),
            OutputInt | OutputIntOpt | OutputFloat | OutputFloatOpt => match arg.value {
                ArgumentValue::Identifier(_) => {
                    let value = self.resolve_var_arg(arg, scope, None)?;
                    self.check_entity_type(&value, param.entity_type, arg.span, true);
                    Some(value)
                }
                _ => {
                    self.error(
                        arg.span,
                        DiagnosticKind::ExpectedOutputVariable,
                        "output parameter must be a variable",
                    );
                    None
                }
            },
            Label | LabelOpt => match arg.value {
                ArgumentValue::Identifier(name) => match self.symbols.lookup_label(name) {
                    Some(label) => Some(SemaArgumentValue::Label(label)),
                    None => {
                        self.error(arg.span, DiagnosticKind::UnknownLabel, format!("unknown label `{name}`"));
                        None
                    }
                },
                _ => {
                    self.error(arg.span, DiagnosticKind::ExpectedLabel, "expected a label");
                    None
                }
            },
            TextLabel | TextLabelOpt => match arg.value {
                ArgumentValue::Identifier(text) if text.len() <= MAX_TEXT_LABEL_LEN => {
                    Some(SemaArgumentValue::TextLabel(text))
                }
                ArgumentValue::Identifier(_) => {
                    self.error(
                        arg.span,
                        DiagnosticKind::TextLabelTooLong,
                        format!("text label longer than {MAX_TEXT_LABEL_LEN} characters"),
                    );
                    None
                }
                _ => {
                    self.error(arg.span, DiagnosticKind::ExpectedTextLabel, "expected a text label");
                    None
                }
            },
            String | StringOpt => match arg.value {
                ArgumentValue::String(text) if text.len() <= MAX_STRING_LEN => {
                    Some(SemaArgumentValue::QuotedString(text))
                }
                ArgumentValue::String(_) => {
                    self.error(
                        arg.span,
                        DiagnosticKind::StringTooLong,
                        format!("string longer than {MAX_STRING_LEN} bytes"),
                    );
                    None
                }
                _ => {
                    self.error(arg.span, DiagnosticKind::ExpectedString, "expected a quoted string");
                    None
                }
            },
            Filename | FilenameOpt => match arg.value {
                ArgumentValue::Filename(name) => {
                    let mut files = self.files.borrow_mut();
                    let file =
                        files.get(name).unwrap_or_else(|| files.insert_or_get(name, FileType::Mission));
                    Some(SemaArgumentValue::Filename(file))
                }
                _ => {
                    self.error(arg.span, DiagnosticKind::ExpectedFilename, "expected a filename");
                    None
                }
            },
            Object | ObjectOpt => match arg.value {
                ArgumentValue::Identifier(name) => match self.models.find_model(name) {
                    Some(_) => {
                        let (obj, _) = self.symbols.insert_used_object(name, arg.span);
                        Some(SemaArgumentValue::UsedObject(obj))
                    }
                    None => {
                        self.error(
                            arg.span,
                            DiagnosticKind::UnknownUsedObject,
                            format!("unknown used object `{name}`"),
                        );
                        None
                    }
                },
                _ => {
                    self.error(arg.span, DiagnosticKind::ExpectedObjectName, "expected an object name");
                    None
                }
            },
        }
    }

    /// Applies a parameter's entity-type restriction, if any, to a resolved
    /// variable argument. `refine` is true for `OUTPUT_*` parameters, which
    /// narrow the variable's recorded type; false for `INPUT_*`/literal-int
    /// parameters, which only check agreement with whatever was already
    /// recorded.
    fn check_entity_type(
        &mut self,
        value: &SemaArgumentValue<'a>,
        entity_type: EntityId,
        span: Span,
        refine: bool,
    ) {
        if entity_type == EntityId::no_entity_type() {
            return;
        }
        let SemaArgumentValue::Var(VarRef { var, .. }) = value else { return };
        if refine {
            if self.symbols.refine_entity_type(var, entity_type).is_err() {
                self.error(
                    span,
                    DiagnosticKind::EntityTypeMismatch,
                    "entity type mismatch: variable already narrowed to a different type",
                );
            }
        } else if let Some(current) = var.entity_type() {
            if current != entity_type {
                self.error(span, DiagnosticKind::EntityTypeMismatch, "entity type mismatch");
            }
        }
    }

    fn resolve_constant_or_var(
        &mut self,
        name: &str,
        arg: Argument<'a>,
        scope: ScopeId,
    ) -> Option<SemaArgumentValue<'a>> {
        if let Some(constant) = self.commands.find_constant_any_means(name) {
            return Some(SemaArgumentValue::StringConstant {
                enum_id: constant.enum_id,
                value: constant.value,
            });
        }
        if let Some(obj) = self.symbols.lookup_used_object(name) {
            return Some(SemaArgumentValue::UsedObject(obj));
        }
        self.resolve_var_arg(arg, scope, None)
    }

    fn resolve_var_arg(
        &mut self,
        arg: Argument<'a>,
        scope: ScopeId,
        expected: Option<VarType>,
    ) -> Option<SemaArgumentValue<'a>> {
        let ArgumentValue::Identifier(text) = arg.value else {
            self.error(arg.span, DiagnosticKind::ExpectedVariable, "expected a variable reference");
            return None;
        };
        let (name, subscript_text) = split_subscript(text);
        let var = self
            .symbols
            .lookup_var(name, scope)
            .or_else(|| self.symbols.lookup_var(name, self.symbols.global_scope()));
        let var = match var {
            Some(var) => var,
            None => {
                self.error(arg.span, DiagnosticKind::UnknownVariable, format!("unknown variable `{name}`"));
                return None;
            }
        };
        if let Some(expected) = expected {
            if var.ty != expected {
                self.error(
                    arg.span,
                    DiagnosticKind::WrongVariableType,
                    format!("`{name}` has the wrong type for this parameter"),
                );
                return None;
            }
        }
        let subscript = match subscript_text {
            None => None,
            Some(text) => match text.parse::<i32>() {
                Ok(n) => Some(Subscript::Constant(n)),
                Err(_) => {
                    let sub_var = self
                        .symbols
                        .lookup_var(text, scope)
                        .or_else(|| self.symbols.lookup_var(text, self.symbols.global_scope()));
                    match sub_var {
                        Some(sub_var) => Some(Subscript::Variable(sub_var)),
                        None => {
                            self.error(
                                arg.span,
                                DiagnosticKind::UnknownSubscriptVariable,
                                format!("unknown subscript variable `{text}`"),
                            );
                            return None;
                        }
                    }
                }
            },
        };
        Some(SemaArgumentValue::Var(VarRef { var, subscript }))
    }
}

fn var_type_of(command_suffix: &str) -> VarType {
    match command_suffix {
        "VAR_INT" => VarType::Int,
        "VAR_FLOAT" => VarType::Float,
        "VAR_TEXT_LABEL" => VarType::TextLabel,
        _ => unreachable!("caller only passes the three declaration commands"),
    }
}

fn var_type_for_param(ty: ParamType) -> VarType {
    use ParamType::*;
    match ty {
        VarInt | VarIntOpt | LvarInt | LvarIntOpt => VarType::Int,
        VarFloat | VarFloatOpt | LvarFloat | LvarFloatOpt => VarType::Float,
        VarTextLabel | VarTextLabelOpt | LvarTextLabel | LvarTextLabelOpt => VarType::TextLabel,
        _ => unreachable!("caller only passes (L)VAR_* parameter types"),
    }
}

//! Codec emitter: renders a `CodecPlan` as Rust source targeting the
//! `compiled_json_rt` runtime crate.
//!
//! Rendering is a pure function of the plan, so artifacts can be produced in
//! parallel and compared byte for byte across runs.
mod enums;
mod family;
mod structs;

use crate::builtins::Form;
use crate::decl::DeclId;
use crate::ir::{Access, Literal};
use crate::plan::{CodecPlan, CodecRef, ExternalPlan, PlanBody};

pub const RUNTIME: &str = "::compiled_json_rt";
pub const HEADER: &str = "// @generated by compiled-json. Do not edit.";

/// One generated source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Module path, e.g. `shop::_Order_JsonCodec`.
    pub name: String,
    pub attributed_to: Vec<DeclId>,
    pub text: String,
}

pub fn emit(plan: &CodecPlan) -> Artifact {
    let mut cg = Codegen::new();
    cg.emit(plan);
    Artifact { name: plan.ident.clone(), attributed_to: vec![plan.attributed_to], text: cg.into_string() }
}

// ————————————————————————————————————————————————————————————————————————————
// OUTPUT BUFFER
// ————————————————————————————————————————————————————————————————————————————

pub struct Codegen {
    output: String,
    indent: usize,
}

impl Codegen {
    pub fn new() -> Self {
        Self { output: String::new(), indent: 0 }
    }

    pub fn into_string(self) -> String {
        self.output
    }

    pub fn emit(&mut self, plan: &CodecPlan) {
        self.emit_preamble();
        match &plan.body {
            PlanBody::Struct(info) => structs::emit(self, plan, info),
            PlanBody::Enum(info) => enums::emit(self, plan, info),
            PlanBody::External(info) => emit_external(self, plan, info),
            PlanBody::Family(info) => family::emit(self, plan, info),
        }
    }

    pub(crate) fn emit_line(&mut self, s: &str) {
        if s.is_empty() {
            self.output.push('\n');
            return;
        }
        for _ in 0..self.indent {
            self.output.push_str("    ");
        }
        self.output.push_str(s);
        self.output.push('\n');
    }

    pub(crate) fn blank(&mut self) {
        self.output.push('\n');
    }

    /// Line ending in `{`, then indent.
    pub(crate) fn open(&mut self, s: &str) {
        self.emit_line(s);
        self.indent += 1;
    }

    pub(crate) fn close(&mut self, s: &str) {
        self.indent = self.indent.saturating_sub(1);
        self.emit_line(s);
    }

    fn emit_preamble(&mut self) {
        self.emit_line(HEADER);
        self.emit_line("#![allow(non_snake_case, non_camel_case_types, unused_imports, unused_mut, unused_labels, unused_variables)]");
        self.blank();
        self.emit_line(&format!(
            "use {RUNTIME}::{{codec, JsonReader, JsonWriter, ReadError, ReadResult, Registry, WriteError, WriteResult}};"
        ));
        self.emit_line(&format!("use {RUNTIME}::{{boolean, number, string, time, uuid}};"));
        self.blank();
    }

    /// `pub struct Configuration;` plus its `configure` body.
    pub(crate) fn emit_configuration(&mut self, body: impl FnOnce(&mut Self)) {
        self.emit_line("pub struct Configuration;");
        self.blank();
        self.open(&format!("impl {RUNTIME}::Configuration for Configuration {{"));
        self.open("fn configure(&self, registry: &mut Registry) {");
        body(self);
        self.close("}");
        self.close("}");
    }
}

impl Default for Codegen {
    fn default() -> Self {
        Self::new()
    }
}

fn emit_external(cg: &mut Codegen, plan: &CodecPlan, info: &ExternalPlan) {
    let target = &plan.type_path;
    let converter = crate::plan::local_path(&info.converter);
    cg.emit_configuration(|cg| {
        cg.emit_line(&format!("registry.register_reader::<{target}>({converter}::{});", info.reader));
        cg.emit_line(&format!("registry.register_writer::<{target}>({converter}::{});", info.writer));
    });
}

// ————————————————————————————————————————————————————————————————————————————
// SHARED RENDERING
// ————————————————————————————————————————————————————————————————————————————

/// Composed codec value for a non-built-in attribute.
pub(crate) fn render_codec(codec: &CodecRef) -> String {
    match codec {
        CodecRef::Builtin(b) => format!("codec::builtin({}, {})", b.writer_path(), b.reader_path()),
        CodecRef::Lookup { type_name, local } => {
            format!("codec::lookup::<{}>(registry)", CodecRef::lookup_path(type_name, *local))
        }
        CodecRef::Family { type_name } => {
            format!("codec::lookup::<Box<dyn {}>>(registry)", crate::plan::local_path(type_name))
        }
        CodecRef::Dynamic { type_name } => format!("codec::dynamic(registry, {type_name:?})"),
        CodecRef::Optional(inner) => format!("codec::option({})", render_codec(inner)),
        CodecRef::List(inner) => format!("codec::list({})", render_codec(inner)),
        CodecRef::Map(inner) => format!("codec::map({})", render_codec(inner)),
        CodecRef::Boxed(inner) => format!("codec::boxed({})", render_codec(inner)),
    }
}

/// Statement writing `value` (an expression of type `&T`) with `codec`.
/// Built-ins are called directly.
pub(crate) fn render_write(codec: &CodecRef, value: &str) -> String {
    match codec {
        CodecRef::Builtin(b) => format!("{}(writer, {value});", b.writer_path()),
        other => format!("{}.write(writer, {value})?;", render_codec(other)),
    }
}

/// Expression reading one value with `codec`.
pub(crate) fn render_read(codec: &CodecRef) -> String {
    match codec {
        CodecRef::Builtin(b) => format!("{}(reader)?", b.reader_path()),
        other => format!("{}.read(reader)?", render_codec(other)),
    }
}

pub(crate) fn render_access(target: &str, access: &Access) -> String {
    match access {
        Access::Field(name) => format!("{target}.{name}"),
        Access::Method(name) => format!("{target}.{name}()"),
    }
}

fn is_nullable_codec(codec: &CodecRef) -> bool {
    match codec {
        CodecRef::Builtin(b) => b.form == Form::Nullable,
        CodecRef::Optional(_) => true,
        _ => false,
    }
}

fn is_float_codec(codec: &CodecRef) -> bool {
    match codec {
        CodecRef::Builtin(b) => matches!(b.prim, crate::builtins::Prim::F32 | crate::builtins::Prim::F64),
        CodecRef::Optional(inner) => is_float_codec(inner),
        _ => false,
    }
}

/// Rust expression for a default literal, shaped by the attribute's codec.
pub(crate) fn render_literal(literal: &Literal, codec: &CodecRef) -> String {
    let plain = match literal {
        Literal::Null => return "None".to_string(),
        Literal::EmptyList => return "Vec::new()".to_string(),
        Literal::EmptyMap | Literal::TypeDefault => return "Default::default()".to_string(),
        Literal::Bool(b) => b.to_string(),
        Literal::Int(i) if is_float_codec(codec) => format!("{i}.0"),
        Literal::Int(i) => i.to_string(),
        Literal::Float(f) => format!("{:?}", f.0),
        Literal::Char(c) => format!("{c:?}"),
        Literal::Str(s) => format!("String::from({s:?})"),
        Literal::Variant { type_name, name } => format!("{}::{name}", crate::plan::local_path(type_name)),
    };
    if is_nullable_codec(codec) { format!("Some({plain})") } else { plain }
}

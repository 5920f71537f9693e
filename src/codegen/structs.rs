use crate::ir::{Access, Constructor, WireShape};
use crate::plan::{CodecPlan, ConstructPlan, FieldPlan, Store, StructPlan};

use super::{render_access, render_literal, render_read, render_write, Codegen, RUNTIME};

pub(super) fn emit(cg: &mut Codegen, plan: &CodecPlan, info: &StructPlan) {
    let ty = plan.type_path.as_str();
    cg.emit_line(&format!("const TYPE: &str = {:?};", plan.type_name));
    cg.blank();
    for shape in [WireShape::Object, WireShape::Array] {
        if let Some(fields) = info.shape(shape) {
            emit_converter(cg, ty, info, shape, fields);
            cg.blank();
        }
    }
    cg.emit_configuration(|cg| emit_registration(cg, ty, info));
}

fn converter_name(shape: WireShape) -> &'static str {
    match shape {
        WireShape::Object => "ObjectFormatConverter",
        WireShape::Array => "ArrayFormatConverter",
    }
}

fn emit_converter(cg: &mut Codegen, ty: &str, info: &StructPlan, shape: WireShape, fields: &[FieldPlan]) {
    let name = converter_name(shape);
    cg.emit_line(&format!("pub struct {name};"));
    cg.blank();
    cg.open(&format!("impl {name} {{"));
    emit_writer(cg, ty, shape, fields);
    cg.blank();
    match &info.construct {
        ConstructPlan::Mutate { via } => {
            cg.open(&format!("pub fn read(registry: &Registry, reader: &mut JsonReader) -> ReadResult<{ty}> {{"));
            let init = match via {
                Some(ctor) => format!("{ty}::{ctor}()"),
                None => "Default::default()".to_string(),
            };
            cg.emit_line(&format!("let mut instance: {ty} = {init};"));
            cg.emit_line("Self::bind(registry, reader, &mut instance)?;");
            cg.emit_line("Ok(instance)");
            cg.close("}");
            cg.blank();
            emit_binder(cg, ty, shape, fields);
        }
        ConstructPlan::Args { ctor, params } => emit_constructing_reader(cg, ty, shape, fields, ctor, params),
    }
    cg.close("}");
}

fn emit_writer(cg: &mut Codegen, ty: &str, shape: WireShape, fields: &[FieldPlan]) {
    cg.open(&format!("pub fn write(registry: &Registry, writer: &mut JsonWriter, value: &{ty}) -> WriteResult {{"));
    match shape {
        WireShape::Object => cg.emit_line("writer.start_object();"),
        WireShape::Array => cg.emit_line("writer.start_array();"),
    }
    for field in fields {
        match shape {
            WireShape::Object => cg.emit_line(&format!("writer.field({:?});", field.key)),
            WireShape::Array => cg.emit_line("writer.element();"),
        }
        let value = format!("&{}", render_access("value", &field.read));
        cg.emit_line(&render_write(&field.codec, &value));
    }
    match shape {
        WireShape::Object => cg.emit_line("writer.end_object();"),
        WireShape::Array => cg.emit_line("writer.end_array();"),
    }
    cg.emit_line("Ok(())");
    cg.close("}");
}

/// Fields whose absence is only detectable with a flag.
fn tracks_presence(field: &FieldPlan) -> bool {
    matches!(field.store, Store::Assign(_)) && (field.required || field.explicit_default)
}

fn emit_binder(cg: &mut Codegen, ty: &str, shape: WireShape, fields: &[FieldPlan]) {
    cg.open(&format!(
        "pub fn bind(registry: &Registry, reader: &mut JsonReader, instance: &mut {ty}) -> ReadResult<()> {{"
    ));
    for field in fields.iter().filter(|f| tracks_presence(f)) {
        cg.emit_line(&format!("let mut seen_{} = false;", field.attribute));
    }
    emit_parse(cg, shape, fields);
    for field in fields.iter().filter(|f| tracks_presence(f)) {
        let Store::Assign(access) = &field.store else { continue };
        cg.open(&format!("if !seen_{} {{", field.attribute));
        if field.required {
            cg.emit_line(&format!("return Err(ReadError::missing_required(TYPE, {:?}));", field.key));
        } else {
            emit_store(cg, access, &render_literal(&field.default, &field.codec));
        }
        cg.close("}");
    }
    cg.emit_line("Ok(())");
    cg.close("}");
}

fn emit_constructing_reader(
    cg: &mut Codegen,
    ty: &str,
    shape: WireShape,
    fields: &[FieldPlan],
    ctor: &Constructor,
    params: &[FieldPlan],
) {
    cg.open(&format!("pub fn read(registry: &Registry, reader: &mut JsonReader) -> ReadResult<{ty}> {{"));
    for (slot, param) in params.iter().enumerate() {
        if !param.ignored {
            cg.emit_line(&format!("let mut p{slot} = None;"));
        }
    }
    emit_parse(cg, shape, fields);
    for (slot, param) in params.iter().enumerate() {
        let default = render_literal(&param.default, &param.codec);
        if param.ignored {
            cg.emit_line(&format!("let v{slot} = {default};"));
            continue;
        }
        cg.open(&format!("let v{slot} = match p{slot} {{"));
        cg.emit_line("Some(value) => value,");
        if param.required {
            cg.emit_line(&format!("None => return Err(ReadError::missing_required(TYPE, {:?})),", param.key));
        } else {
            cg.emit_line(&format!("None => {default},"));
        }
        cg.close("};");
    }
    let call = match ctor {
        Constructor::Function(name) => {
            let args: Vec<String> = (0..params.len()).map(|slot| format!("v{slot}")).collect();
            format!("{ty}::{name}({})", args.join(", "))
        }
        Constructor::Literal => {
            let inits: Vec<String> =
                params.iter().enumerate().map(|(slot, p)| format!("{}: v{slot}", p.attribute)).collect();
            format!("{ty} {{ {} }}", inits.join(", "))
        }
    };
    cg.emit_line(&format!("Ok({call})"));
    cg.close("}");
}

/// Consume one value of the given shape, storing every recognized field.
fn emit_parse(cg: &mut Codegen, shape: WireShape, fields: &[FieldPlan]) {
    match shape {
        WireShape::Object => {
            cg.emit_line("reader.start_object()?;");
            cg.open("while let Some(key) = reader.next_key()? {");
            cg.open("match key.as_str() {");
            for field in fields.iter().filter(|f| f.store != Store::Skip) {
                cg.open(&format!("{:?} => {{", field.key));
                emit_field_read(cg, field);
                cg.close("}");
            }
            cg.emit_line("_ => reader.skip()?,");
            cg.close("}");
            cg.close("}");
        }
        WireShape::Array => {
            cg.emit_line("reader.start_array()?;");
            cg.open("'elements: {");
            for field in fields {
                cg.open("if !reader.next_element()? {");
                cg.emit_line("break 'elements;");
                cg.close("}");
                emit_field_read(cg, field);
            }
            cg.open("if reader.next_element()? {");
            cg.emit_line(&format!("return Err(ReadError::too_many_elements(TYPE, {}));", fields.len()));
            cg.close("}");
            cg.close("}");
        }
    }
}

fn emit_field_read(cg: &mut Codegen, field: &FieldPlan) {
    if tracks_presence(field) {
        cg.emit_line(&format!("seen_{} = true;", field.attribute));
    }
    if field.store == Store::Skip {
        cg.emit_line("reader.skip()?;");
        return;
    }
    if !field.nullable {
        cg.emit_line(&format!("reader.reject_null(TYPE, {:?})?;", field.key));
    }
    let value = render_read(&field.codec);
    match &field.store {
        Store::Assign(access) => emit_store(cg, access, &value),
        Store::Arg(slot) => cg.emit_line(&format!("p{slot} = Some({value});")),
        Store::Skip => {}
    }
}

fn emit_store(cg: &mut Codegen, access: &Access, value: &str) {
    match access {
        Access::Field(name) => cg.emit_line(&format!("instance.{name} = {value};")),
        Access::Method(name) => cg.emit_line(&format!("instance.{name}({value});")),
    }
}

fn emit_registration(cg: &mut Codegen, ty: &str, info: &StructPlan) {
    let shapes: Vec<WireShape> =
        [WireShape::Object, WireShape::Array].into_iter().filter(|s| info.shape(*s).is_some()).collect();
    if info.both_shapes() {
        cg.open(&format!("registry.register_format({RUNTIME}::FormatDescription::<{ty}> {{"));
        cg.emit_line(&format!("type_alias: {:?},", info.type_alias));
        cg.emit_line(&format!("object_first: {},", info.preferred == WireShape::Object));
        for shape in shapes {
            let name = converter_name(shape);
            let field = match shape {
                WireShape::Object => "object",
                WireShape::Array => "array",
            };
            let bind = if info.has_binder() { format!("Some({name}::bind)") } else { "None".to_string() };
            cg.emit_line(&format!(
                "{field}: Some({RUNTIME}::FormatConverter {{ read: {name}::read, write: {name}::write, bind: {bind} }}),"
            ));
        }
        cg.close("});");
        return;
    }
    for shape in shapes {
        let name = converter_name(shape);
        cg.emit_line(&format!("registry.register_reader::<{ty}>({name}::read);"));
        cg.emit_line(&format!("registry.register_writer::<{ty}>({name}::write);"));
        if info.has_binder() {
            cg.emit_line(&format!("registry.register_binder::<{ty}>({name}::bind);"));
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::codegen::emit;
    use crate::fixtures;
    use crate::lower::lower;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn render(decls: serde_json::Value, name: &str) -> String {
        let graph = fixtures::graph(&fixtures::source(decls));
        emit(&lower(graph.get(name).unwrap(), &graph)).text
    }

    #[test]
    fn point_object_shape() {
        let text = render(json!([fixtures::point(json!("object"))]), "geo::Point");
        let expected = r#"// @generated by compiled-json. Do not edit.
#![allow(non_snake_case, non_camel_case_types, unused_imports, unused_mut, unused_labels, unused_variables)]

use ::compiled_json_rt::{codec, JsonReader, JsonWriter, ReadError, ReadResult, Registry, WriteError, WriteResult};
use ::compiled_json_rt::{boolean, number, string, time, uuid};

const TYPE: &str = "geo::Point";

pub struct ObjectFormatConverter;

impl ObjectFormatConverter {
    pub fn write(registry: &Registry, writer: &mut JsonWriter, value: &crate::geo::Point) -> WriteResult {
        writer.start_object();
        writer.field("x");
        number::write_i32(writer, &value.x);
        writer.field("y");
        number::write_i32(writer, &value.y);
        writer.end_object();
        Ok(())
    }

    pub fn read(registry: &Registry, reader: &mut JsonReader) -> ReadResult<crate::geo::Point> {
        let mut instance: crate::geo::Point = Default::default();
        Self::bind(registry, reader, &mut instance)?;
        Ok(instance)
    }

    pub fn bind(registry: &Registry, reader: &mut JsonReader, instance: &mut crate::geo::Point) -> ReadResult<()> {
        reader.start_object()?;
        while let Some(key) = reader.next_key()? {
            match key.as_str() {
                "x" => {
                    reader.reject_null(TYPE, "x")?;
                    instance.x = number::read_i32(reader)?;
                }
                "y" => {
                    reader.reject_null(TYPE, "y")?;
                    instance.y = number::read_i32(reader)?;
                }
                _ => reader.skip()?,
            }
        }
        Ok(())
    }
}

pub struct Configuration;

impl ::compiled_json_rt::Configuration for Configuration {
    fn configure(&self, registry: &mut Registry) {
        registry.register_reader::<crate::geo::Point>(ObjectFormatConverter::read);
        registry.register_writer::<crate::geo::Point>(ObjectFormatConverter::write);
        registry.register_binder::<crate::geo::Point>(ObjectFormatConverter::bind);
    }
}
"#;
        assert_eq!(text, expected);
    }

    #[test]
    fn point_array_shape_reads_positionally() {
        let text = render(json!([fixtures::point(json!("array"))]), "geo::Point");
        assert!(text.contains("pub struct ArrayFormatConverter;"));
        assert!(!text.contains("ObjectFormatConverter"));
        assert!(text.contains("        writer.element();\n        number::write_i32(writer, &value.x);\n"));
        assert!(text.contains("return Err(ReadError::too_many_elements(TYPE, 2));"));
        assert!(text.contains("if !reader.next_element()? {\n                break 'elements;"));
    }

    #[test]
    fn required_and_default_handling() {
        let text = render(fixtures::shop(), "shop::Order");
        assert!(text.contains("let mut seen_id = false;"));
        assert!(text.contains("return Err(ReadError::missing_required(TYPE, \"id\"));"));
        assert!(text.contains("if !seen_note {\n            instance.note = String::from(\"none\");"));
        assert!(text.contains("\"n\" => {"));
        assert!(!text.contains("cache"));
        assert!(text.contains(
            "instance.lines = codec::list(codec::lookup::<crate::shop::Line>(registry)).read(reader)?;"
        ));
        // nullable attributes accept null
        assert!(!text.contains("reject_null(TYPE, \"status\")"));
        assert!(text.contains("registry.register_format(::compiled_json_rt::FormatDescription::<crate::shop::Order> {"));
        assert!(text.contains("object_first: true,"));
        assert!(text.contains("bind: Some(ArrayFormatConverter::bind)"));
    }

    #[test]
    fn constructor_materialization() {
        let text = render(json!([fixtures::money()]), "bank::Money");
        assert!(text.contains("let mut p0 = None;"));
        assert!(text.contains("p1 = Some(string::read_string(reader)?);"));
        assert!(text.contains("None => 0,"));
        assert!(text.contains("None => String::from(\"\"),"));
        assert!(text.contains("Ok(crate::bank::Money::of(v0, v1))"));
        assert!(text.contains("number::write_i64(writer, &value.amount());"));
        assert!(!text.contains("register_binder"));
    }

    #[test]
    fn struct_expression_materialization() {
        let decl = json!({
            "name": "geo::Size",
            "annotations": fixtures::marker(json!({})),
            "fields": [{ "name": "w", "ty": "u32" }, { "name": "h", "ty": "u32" }]
        });
        let text = render(json!([decl]), "geo::Size");
        assert!(text.contains("Ok(crate::geo::Size { w: v0, h: v1 })"));
    }

    #[test]
    fn boxed_and_family_attributes() {
        let text = render(fixtures::linked_list(), "list::Node");
        assert!(text.contains(
            "instance.next = codec::option(codec::boxed(codec::lookup::<crate::list::Node>(registry))).read(reader)?;"
        ));

        let text = render(fixtures::pen(), "zoo::Pen");
        assert!(text.contains("instance.pet = codec::lookup::<Box<dyn crate::zoo::Animal>>(registry).read(reader)?;"));
        assert!(text.contains("codec::lookup::<Box<dyn crate::zoo::Animal>>(registry).write(writer, &value.pet)?;"));
    }
}

use crate::plan::{CodecPlan, EnumPlan};

use super::Codegen;

pub(super) fn emit(cg: &mut Codegen, plan: &CodecPlan, info: &EnumPlan) {
    let ty = plan.type_path.as_str();
    cg.emit_line(&format!("const TYPE: &str = {:?};", plan.type_name));
    cg.blank();
    cg.emit_line("pub struct EnumConverter;");
    cg.blank();
    cg.open("impl EnumConverter {");

    cg.open(&format!("pub fn write(registry: &Registry, writer: &mut JsonWriter, value: &{ty}) -> WriteResult {{"));
    cg.open("let name = match value {");
    for (variant, external) in &info.constants {
        cg.emit_line(&format!("{ty}::{variant} => {external:?},"));
    }
    if info.partial {
        cg.emit_line("_ => return Err(WriteError::unsupported_variant(TYPE)),");
    }
    cg.close("};");
    cg.emit_line("string::write_str(writer, name);");
    cg.emit_line("Ok(())");
    cg.close("}");
    cg.blank();

    cg.open(&format!("pub fn read(registry: &Registry, reader: &mut JsonReader) -> ReadResult<{ty}> {{"));
    cg.emit_line("let name = reader.read_string()?;");
    cg.open("match name.as_str() {");
    for (variant, external) in &info.constants {
        cg.emit_line(&format!("{external:?} => Ok({ty}::{variant}),"));
    }
    cg.emit_line("_ => Err(ReadError::unknown_variant(TYPE, &name)),");
    cg.close("}");
    cg.close("}");

    cg.close("}");
    cg.blank();
    cg.emit_configuration(|cg| {
        cg.emit_line(&format!("registry.register_reader::<{ty}>(EnumConverter::read);"));
        cg.emit_line(&format!("registry.register_writer::<{ty}>(EnumConverter::write);"));
    });
}

use crate::plan::{local_path, CodecPlan, FamilyPlan};

use super::{Codegen, RUNTIME};

pub(super) fn emit(cg: &mut Codegen, plan: &CodecPlan, info: &FamilyPlan) {
    let family = format!("dyn {}", plan.type_path);
    let disc = format!("{:?}", info.discriminator);
    cg.emit_line(&format!("const TYPE: &str = {:?};", plan.type_name));
    cg.emit_line(&format!("const DISCRIMINATOR: &str = {disc};"));
    cg.blank();
    cg.emit_line("pub struct MixinConverter;");
    cg.blank();
    cg.open("impl MixinConverter {");

    cg.open(&format!("pub fn write(registry: &Registry, writer: &mut JsonWriter, value: &{family}) -> WriteResult {{"));
    for member in &info.members {
        let path = local_path(&member.type_name);
        cg.open(&format!("if let Some(member) = value.as_any().downcast_ref::<{path}>() {{"));
        cg.emit_line(&format!("return registry.write_member(writer, DISCRIMINATOR, {:?}, member);", member.tag));
        cg.close("}");
    }
    cg.emit_line("Err(WriteError::unknown_member(TYPE))");
    cg.close("}");
    cg.blank();

    cg.open(&format!("pub fn read(registry: &Registry, reader: &mut JsonReader) -> ReadResult<Box<{family}>> {{"));
    cg.open("match reader.peek_tag(DISCRIMINATOR)?.as_deref() {");
    for member in &info.members {
        cg.emit_line(&format!("Some({:?}) => {},", member.tag, read_member(&member.type_name, &family)));
    }
    match info.default_member() {
        Some(fallback) => {
            cg.emit_line(&format!("_ => {},", read_member(&fallback.type_name, &family)));
        }
        None => {
            cg.emit_line("Some(found) => Err(ReadError::unknown_discriminator(TYPE, found)),");
            cg.emit_line("None => Err(ReadError::missing_discriminator(TYPE)),");
        }
    }
    cg.close("}");
    cg.close("}");

    cg.close("}");
    cg.blank();
    cg.emit_configuration(|cg| match info.default_member() {
        None => {
            cg.open(&format!("registry.register_mixin({RUNTIME}::MixinDescription::<{family}> {{"));
            cg.emit_line("type_alias: TYPE,");
            cg.emit_line("discriminator: DISCRIMINATOR,");
            cg.emit_line("read: MixinConverter::read,");
            cg.emit_line("write: MixinConverter::write,");
            cg.close("});");
        }
        Some(_) => {
            cg.emit_line(&format!("registry.register_mixin_writer::<{family}>(MixinConverter::write);"));
            cg.emit_line(&format!("registry.register_reader::<Box<{family}>>(MixinConverter::read);"));
        }
    });
}

fn read_member(type_name: &str, family: &str) -> String {
    format!(
        "registry.read_member::<{}>(reader, DISCRIMINATOR).map(|v| Box::new(v) as Box<{family}>)",
        local_path(type_name)
    )
}

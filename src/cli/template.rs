use coalesce::adapters::builtin_registry;
use coalesce::templating::build_message_template;
use coalesce::CoalesceError;

use super::TemplateArgs;

pub fn handle_template(args: TemplateArgs) -> Result<(), CoalesceError> {
    let config = super::load_config(args.config.as_deref())?;
    let registry = builtin_registry()?;
    let template = build_message_template(&registry, &config.templates)?;
    print!("{}", template);
    Ok(())
}

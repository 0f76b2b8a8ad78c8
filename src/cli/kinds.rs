use coalesce::adapters::builtin_registry;
use coalesce::CoalesceError;

pub fn handle_kinds() -> Result<(), CoalesceError> {
    let registry = builtin_registry()?;
    for kind in registry.all_kinds() {
        match registry.severity(&kind) {
            Some(severity) => println!("{} ({})", kind, severity),
            None => println!("{}", kind),
        }
    }
    Ok(())
}

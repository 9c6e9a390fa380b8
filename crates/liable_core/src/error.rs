/// Failures raised by the core.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LiableError {
    #[error("Object \"{object}\" not found in namespace.")]
    NotFound { object: String },
    #[error("{}", describe_module_set(.modules))]
    AmbiguousModuleSet { modules: Vec<String> },
    #[error("Cannot import \"{object}\" from module \"{module}\".")]
    UnresolvedImport { module: String, object: String },
    #[error(
        "Invalid parameter: \"{parameter}\", different annotations should agree, \
         but found \"{previous}\", \"{current}\"."
    )]
    InconsistentAnnotation {
        parameter: String,
        previous: String,
        current: String,
    },
    #[error("Do not know how to normalize \"{object}\": {reason}.")]
    MalformedAnnotationNode { object: String, reason: String },
    #[error("\"{object}\" is not a function.")]
    NotCallable { object: String },
    #[error("No module named \"{0}\".")]
    UnknownModule(String),
}

fn describe_module_set(modules: &[String]) -> String {
    if modules.is_empty() {
        return "No modules paths found.".to_string();
    }
    let names: Vec<String> = modules.iter().map(|name| format!("\"{name}\"")).collect();
    format!(
        "Found modules paths for different modules: {}.",
        names.join(", ")
    )
}

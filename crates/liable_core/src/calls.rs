use crate::annotation::Annotation;
use crate::error::LiableError;
use crate::namespace::{Namespace, Resolver};
use crate::signature::ParameterKind;
use crate::universe::EntityId;

const ARGUMENTS_SEPARATOR: &str = ",\n";

#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Literal {
    fn render(&self) -> String {
        match self {
            Literal::Str(value) => format!("'{value}'"),
            Literal::Int(value) => value.to_string(),
            Literal::Float(value) => format!("{value:?}"),
            Literal::Bool(true) => "True".to_string(),
            Literal::Bool(false) => "False".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ArgumentValue {
    Literal(Literal),
    /// A runtime entity, named through the resolver.
    Entity(EntityId),
    Annotation(Annotation),
    Call(FunctionCall),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Argument {
    pub name: String,
    pub value: ArgumentValue,
    pub kind: ParameterKind,
}

impl Argument {
    pub fn new(name: impl Into<String>, value: ArgumentValue, kind: ParameterKind) -> Self {
        Self {
            name: name.into(),
            value,
            kind,
        }
    }

    pub fn to_string(
        &self,
        resolver: &Resolver<'_>,
        namespace: &Namespace,
    ) -> Result<String, LiableError> {
        let value = match &self.value {
            ArgumentValue::Literal(literal) => literal.render(),
            ArgumentValue::Entity(entity) => resolver.search_name(*entity, namespace)?,
            ArgumentValue::Annotation(annotation) => annotation.to_string(resolver, namespace)?,
            ArgumentValue::Call(call) => call.to_string(resolver, namespace)?,
        };
        Ok(match self.kind {
            ParameterKind::PositionalOnly => value,
            ParameterKind::PositionalOrKeyword | ParameterKind::KeywordOnly => {
                format!("{}={value}", self.name)
            }
            ParameterKind::VarPositional => format!("*{value}"),
            ParameterKind::VarKeyword => format!("**{value}"),
        })
    }
}

/// Call of a function as it will appear in generated source.
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionCall {
    pub function: EntityId,
    pub arguments: Vec<Argument>,
}

impl FunctionCall {
    pub fn new(function: EntityId, arguments: Vec<Argument>) -> Self {
        Self {
            function,
            arguments,
        }
    }

    pub fn to_string(
        &self,
        resolver: &Resolver<'_>,
        namespace: &Namespace,
    ) -> Result<String, LiableError> {
        let name = resolver.search_name(self.function, namespace)?;
        let arguments = self
            .arguments
            .iter()
            .map(|argument| argument.to_string(resolver, namespace))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(format!("{name}({})", arguments.join(ARGUMENTS_SEPARATOR)))
    }

    /// Entities the call refers to: the called function, then those of nested calls, then
    /// entity arguments.
    pub fn walk(&self) -> Vec<EntityId> {
        let mut entities = vec![self.function];
        for argument in &self.arguments {
            if let ArgumentValue::Call(call) = &argument.value {
                entities.extend(call.walk());
            }
        }
        entities.extend(self.arguments.iter().filter_map(|argument| match argument.value {
            ArgumentValue::Entity(entity) => Some(entity),
            _ => None,
        }));
        entities
    }
}

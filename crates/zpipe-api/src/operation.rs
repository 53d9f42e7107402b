//! # Handler Operations & Bindings
//!
//! A [`HandlerOperation`] is one request-handling unit: a method, a path,
//! a handler, the pipes that run before it, and the documentation
//! attached to it. Operations are created and decorated once, at
//! registration time, then invoked for every matching request.
//!
//! Decoration is explicit. Each binding function returns a [`Binding`],
//! a list of steps ("add this pipe", "document this parameter", "wrap the
//! handler") that the registration routine applies in order:
//!
//! | Binding | Pipe | Documentation |
//! |---|---|---|
//! | [`body`] | body | request body schema, 400 response |
//! | [`query`] | query | one query parameter per property, 400 response |
//! | [`params`] | path | one path parameter per property, 400 response |
//! | [`returns`] | output check around the handler | success response schema |
//!
//! Query and path bindings on a non-object schema validate as usual but
//! document no parameters.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use axum::http::{Method, StatusCode};
use futures::future::{BoxFuture, FutureExt};
use utoipa::openapi::content::ContentBuilder;
use utoipa::openapi::path::{Operation, OperationBuilder, Parameter, ParameterBuilder, ParameterIn};
use utoipa::openapi::request_body::{RequestBody, RequestBodyBuilder};
use utoipa::openapi::schema::Schema as DocSchema;
use utoipa::openapi::{Required, Response, ResponseBuilder};
use zpipe_core::{Target, ValidationError};
use zpipe_schema::{docgen, CoercionMode, CompiledSchema, Schema, SchemaError};

use crate::error::ApiError;
use crate::handler::{BoxHandler, HandlerResult, RequestInput};
use crate::pipe::{SchemaPipe, VALIDATION_FAILURES_METRIC};

const JSON: &str = "application/json";

/// Documentation schema of the 400 response body.
pub fn validation_error_schema() -> DocSchema {
    docgen::generate(&Schema::object([
        ("error", Schema::string()),
        ("message", Schema::string()),
        ("statusCode", Schema::number()),
    ]))
}

/// The shared "validation failed" response fragment, built once.
pub fn validation_failed_response() -> &'static Response {
    static RESPONSE: OnceLock<Response> = OnceLock::new();
    RESPONSE.get_or_init(|| {
        ResponseBuilder::new()
            .description("Validation failed")
            .content(
                JSON,
                ContentBuilder::new()
                    .schema(Some(validation_error_schema()))
                    .build(),
            )
            .build()
    })
}

/// One request-handling unit and everything attached to it.
pub struct HandlerOperation {
    method: Method,
    path: String,
    operation_id: String,
    summary: Option<String>,
    tags: Vec<String>,
    pipes: Vec<SchemaPipe>,
    request_body: Option<RequestBody>,
    parameters: Vec<Parameter>,
    responses: BTreeMap<u16, Response>,
    success_status: StatusCode,
    handler: BoxHandler,
}

impl std::fmt::Debug for HandlerOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerOperation")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("operation_id", &self.operation_id)
            .field("pipes", &self.pipes.len())
            .field("success_status", &self.success_status)
            .finish_non_exhaustive()
    }
}

impl HandlerOperation {
    /// Create an undecorated operation. The operation id is derived from
    /// the method and path (`GET /users/{id}` → `get_users_id`).
    pub fn new(method: Method, path: impl Into<String>, handler: BoxHandler) -> Self {
        let path = path.into();
        let operation_id = derive_operation_id(&method, &path);
        Self {
            method,
            path,
            operation_id,
            summary: None,
            tags: Vec::new(),
            pipes: Vec::new(),
            request_body: None,
            parameters: Vec::new(),
            responses: BTreeMap::new(),
            success_status: StatusCode::OK,
            handler,
        }
    }

    /// Override the operation id.
    pub fn operation_id(mut self, id: impl Into<String>) -> Self {
        self.operation_id = id.into();
        self
    }

    /// Set a one-line summary.
    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Add a documentation tag.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Apply a binding and return the decorated operation.
    pub fn with(mut self, binding: Binding) -> Self {
        binding.apply(&mut self);
        self
    }

    /// Operation id used in the generated document.
    pub fn id(&self) -> &str {
        &self.operation_id
    }

    /// HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Route template, e.g. `/users/{id}`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Registered pipes, in registration order.
    pub fn pipes(&self) -> &[SchemaPipe] {
        &self.pipes
    }

    /// Documented request body.
    pub fn request_body(&self) -> Option<&RequestBody> {
        self.request_body.as_ref()
    }

    /// Documented query and path parameters.
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Documented responses keyed by status code.
    pub fn responses(&self) -> &BTreeMap<u16, Response> {
        &self.responses
    }

    /// Status returned on success.
    pub fn success_status(&self) -> StatusCode {
        self.success_status
    }

    /// Register a pipe to run before the handler.
    pub fn add_pipe(&mut self, pipe: SchemaPipe) {
        self.pipes.push(pipe);
    }

    /// Document the request body.
    pub fn set_request_body(&mut self, body: RequestBody) {
        self.request_body = Some(body);
    }

    /// Document a query or path parameter.
    pub fn add_parameter(&mut self, parameter: Parameter) {
        self.parameters.push(parameter);
    }

    /// Document a response.
    pub fn add_response(&mut self, status: u16, response: Response) {
        self.responses.insert(status, response);
    }

    /// Replace the handler with one built around the current handler.
    pub fn wrap_handler(&mut self, wrap: impl FnOnce(BoxHandler) -> BoxHandler) {
        let inner = Arc::clone(&self.handler);
        self.handler = wrap(inner);
    }

    /// Run every pipe over every source, in [`Target::ALL`] order.
    pub fn run_pipes(&self, mut input: RequestInput) -> Result<RequestInput, ApiError> {
        for target in Target::ALL {
            let mut value = input.take(target);
            for pipe in &self.pipes {
                value = pipe.transform(value, target)?;
            }
            input.set(target, value);
        }
        Ok(input)
    }

    /// Validate the input, then invoke the (possibly wrapped) handler.
    pub fn call(&self, input: RequestInput) -> BoxFuture<'static, HandlerResult> {
        match self.run_pipes(input) {
            Ok(validated) => (self.handler)(validated),
            Err(err) => futures::future::ready(Err(err)).boxed(),
        }
    }

    /// Render this operation as an OpenAPI operation.
    pub fn to_openapi(&self) -> Operation {
        let mut builder = OperationBuilder::new()
            .operation_id(Some(self.operation_id.clone()))
            .summary(self.summary.clone())
            .request_body(self.request_body.clone());
        if !self.tags.is_empty() {
            builder = builder.tags(Some(self.tags.clone()));
        }
        for parameter in &self.parameters {
            builder = builder.parameter(parameter.clone());
        }
        let success = self.success_status.as_u16();
        if !self.responses.contains_key(&success) {
            builder = builder.response(
                success.to_string(),
                ResponseBuilder::new()
                    .description("Successful response")
                    .build(),
            );
        }
        for (status, response) in &self.responses {
            builder = builder.response(status.to_string(), response.clone());
        }
        builder.build()
    }
}

fn derive_operation_id(method: &Method, path: &str) -> String {
    let mut id = method.as_str().to_ascii_lowercase();
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        let cleaned: String = segment
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
            .map(|c| if c == '-' { '_' } else { c })
            .collect();
        if !cleaned.is_empty() {
            id.push('_');
            id.push_str(&cleaned);
        }
    }
    id
}

// -- Bindings -----------------------------------------------------------------

enum Step {
    Pipe(SchemaPipe),
    RequestBody(RequestBody),
    Parameter(Parameter),
    Response(u16, Response),
    Returns {
        schema: Arc<CompiledSchema>,
        status: StatusCode,
    },
}

/// A composable operation modifier produced by a binding function.
pub struct Binding {
    steps: Vec<Step>,
}

impl Binding {
    /// Apply every step to `operation`, in order.
    pub fn apply(self, operation: &mut HandlerOperation) {
        for step in self.steps {
            match step {
                Step::Pipe(pipe) => operation.add_pipe(pipe),
                Step::RequestBody(body) => operation.set_request_body(body),
                Step::Parameter(parameter) => operation.add_parameter(parameter),
                Step::Response(status, response) => operation.add_response(status, response),
                Step::Returns { schema, status } => {
                    operation.success_status = status;
                    operation.wrap_handler(|inner| validate_returns(schema, inner));
                }
            }
        }
    }

    /// Number of steps. Mostly useful in tests.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the binding does nothing.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Validate the JSON body and document it as the request body.
pub fn body(schema: Schema) -> Result<Binding, SchemaError> {
    let compiled = Arc::new(CompiledSchema::compile(schema)?);
    let request_body = RequestBodyBuilder::new()
        .content(
            JSON,
            ContentBuilder::new()
                .schema(Some(docgen::generate(compiled.schema())))
                .build(),
        )
        .required(Some(if compiled.schema().allows_missing() {
            Required::False
        } else {
            Required::True
        }))
        .build();
    Ok(Binding {
        steps: vec![
            Step::Pipe(SchemaPipe::new(compiled, Target::Body)),
            Step::Response(400, validation_failed_response().clone()),
            Step::RequestBody(request_body),
        ],
    })
}

/// Validate the query string and document one query parameter per property.
pub fn query(schema: Schema) -> Result<Binding, SchemaError> {
    flat_binding(schema, Target::Query, ParameterIn::Query)
}

/// Validate the path parameters and document one path parameter per property.
pub fn params(schema: Schema) -> Result<Binding, SchemaError> {
    flat_binding(schema, Target::Param, ParameterIn::Path)
}

fn flat_binding(schema: Schema, target: Target, location: ParameterIn) -> Result<Binding, SchemaError> {
    let compiled = Arc::new(CompiledSchema::compile(schema)?);
    let documented = parameter_docs(compiled.schema(), &location);
    let mut steps = vec![
        Step::Pipe(SchemaPipe::new(compiled, target)),
        Step::Response(400, validation_failed_response().clone()),
    ];
    steps.extend(documented.into_iter().map(Step::Parameter));
    Ok(Binding { steps })
}

fn parameter_docs(schema: &Schema, location: &ParameterIn) -> Vec<Parameter> {
    let Some(properties) = docgen::properties_of(schema) else {
        tracing::debug!("non-object schema; no per-parameter documentation");
        return Vec::new();
    };
    properties
        .into_iter()
        .map(|property| {
            ParameterBuilder::new()
                .name(property.name)
                .parameter_in(location.clone())
                .required(if property.required || matches!(location, ParameterIn::Path) {
                    Required::True
                } else {
                    Required::False
                })
                .schema(Some(property.schema))
                .build()
        })
        .collect()
}

/// Validate the handler's result and document it as the 200 response.
pub fn returns(schema: Schema) -> Result<Binding, SchemaError> {
    returns_with_status(schema, StatusCode::OK)
}

/// Validate the handler's result and document it under `status`.
pub fn returns_with_status(schema: Schema, status: StatusCode) -> Result<Binding, SchemaError> {
    let compiled = Arc::new(CompiledSchema::compile(schema)?);
    let response = ResponseBuilder::new()
        .description(status.canonical_reason().unwrap_or("Response"))
        .content(
            JSON,
            ContentBuilder::new()
                .schema(Some(docgen::generate(compiled.schema())))
                .build(),
        )
        .build();
    Ok(Binding {
        steps: vec![
            Step::Response(status.as_u16(), response),
            Step::Returns {
                schema: compiled,
                status,
            },
        ],
    })
}

/// Wrap `inner` so every result it produces is parsed against `schema`.
fn validate_returns(schema: Arc<CompiledSchema>, inner: BoxHandler) -> BoxHandler {
    Arc::new(move |input: RequestInput| intercept(Arc::clone(&schema), inner(input)))
}

/// Attach output validation to a pending handler result.
///
/// The check runs as a continuation once `pending` resolves. A violation
/// fails the returned future with [`ValidationError::Output`]; a
/// conforming value resolves to its parsed (coerced) form. Errors from
/// the handler itself pass through untouched.
pub fn intercept(
    schema: Arc<CompiledSchema>,
    pending: BoxFuture<'static, HandlerResult>,
) -> BoxFuture<'static, HandlerResult> {
    async move {
        let value = pending.await?;
        schema
            .parse(value, CoercionMode::Strict)
            .map_err(|violations| {
                tracing::error!(
                    violations = violations.len(),
                    "handler returned a value violating its declared schema: {violations}"
                );
                metrics::counter!(VALIDATION_FAILURES_METRIC, "target" => "output").increment(1);
                ApiError::from(ValidationError::Output { violations })
            })
    }
    .boxed()
}

//! The test runner state machine
//! (`Created -> Merged -> Resolved -> Dispatched -> Validated -> Reconciled | Failed`).

use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

use crate::annotation::{self, MeqaTag};
use crate::compare::ComparisonTracker;
use crate::config::RunnerConfig;
use crate::error::{MeqaError, Result};
use crate::rng::EngineRng;
use crate::schema::generator::Generator;
use crate::schema::model::{HttpMethod, Operation, ParamLocation, Parameter, SwaggerDocument};
use crate::schema::validate;
use crate::schema::walker;
use crate::store::{MatchFn, ShadowStore};
use crate::transport::{HttpRequest, HttpTransport};

use super::orchestrator::PlanOrchestrator;
use super::test::Test;

/// The result of running one test: whether it passed and what status code
/// the server returned, if a dispatch happened at all.
#[derive(Debug, Clone)]
pub struct TestOutcome {
    /// The test's name.
    pub name: String,
    /// Whether the test was judged successful.
    pub success: bool,
    /// The HTTP status code returned, if the test reached dispatch.
    pub status: Option<u16>,
}

/// Owns the shadow store, the PRNG, and the document being tested. One
/// runner executes every test in a plan sequentially.
pub struct TestRunner {
    doc: SwaggerDocument,
    config: RunnerConfig,
    rng: EngineRng,
    store: ShadowStore,
    transport: Box<dyn HttpTransport>,
}

impl TestRunner {
    /// Creates a runner for `doc`, seeding its PRNG from `config` and
    /// starting with an empty shadow store.
    pub fn new(doc: SwaggerDocument, config: RunnerConfig, transport: Box<dyn HttpTransport>) -> Self {
        let rng = EngineRng::new(config.seed());
        Self {
            doc,
            config,
            rng,
            store: ShadowStore::new(),
            transport,
        }
    }

    /// The shadow store accumulated so far, for inspection between or
    /// after test runs.
    pub fn store(&self) -> &ShadowStore {
        &self.store
    }

    /// Mutable access to the shadow store, for callers that need to seed it
    /// with state the plan assumes already exists on the server.
    pub fn store_mut(&mut self) -> &mut ShadowStore {
        &mut self.store
    }

    /// Runs `test`, merging `parent`'s parameters in first when this call
    /// is a `ref` expansion, and delegating back out through `orchestrator`
    /// if `test.ref_` names another test to run instead.
    pub async fn run_test(
        &mut self,
        test: &Test,
        parent: Option<&Test>,
        orchestrator: &dyn PlanOrchestrator,
    ) -> Result<Vec<TestOutcome>> {
        // 1. Duplicate, so the parameter maps below are private to this run.
        let mut test = test.duplicate();

        // 2. Merge with parent.
        if let Some(parent) = parent {
            test = test.merge_with_parent(parent);
        }

        // 3. Ref expansion: delegate and return, no further work here.
        if let Some(ref_name) = test.ref_.clone() {
            debug!(test = %test.name, ref_name = %ref_name, "expanding ref");
            return orchestrator.run(&ref_name, Some(&test)).await;
        }

        let outcome = self.run_resolved(&test).await?;
        Ok(vec![outcome])
    }

    async fn run_resolved(&mut self, test: &Test) -> Result<TestOutcome> {
        let method = HttpMethod::parse(&test.method)
            .ok_or_else(|| MeqaError::invalid(format!("unknown method {:?}", test.method)))?;

        // 4. Resolve parameters.
        let operation = self
            .doc
            .operation(&test.path, method)
            .cloned()
            .ok_or_else(|| MeqaError::not_found(format!("operation {method:?} {}", test.path)))?;
        let operation_tag = annotation::parse(&operation.description);

        let mut tracker = ComparisonTracker::new();
        let resolved = self.resolve_parameters(test, &operation, operation_tag, method, &mut tracker)?;

        debug!(test = %test.name, method = method.as_str(), path = %test.path, "resolved");

        // 5. Dispatch.
        let response = self.dispatch(test, method, &resolved).await?;
        debug!(test = %test.name, status = response.status, "dispatched");

        // 6. Validate response.
        let (decoded_body, response_description) =
            self.validate_response(&operation, response.status, &response.body)?;

        // 7. Determine success.
        let success = determine_success(response.status, response_description, test)?;

        // 8. Reconcile.
        if !success {
            debug!(test = %test.name, status = response.status, "test failed; skipping reconciliation");
            return Ok(TestOutcome {
                name: test.name.clone(),
                success: false,
                status: Some(response.status),
            });
        }

        self.reconcile(method, &tracker, &decoded_body)?;

        Ok(TestOutcome {
            name: test.name.clone(),
            success: true,
            status: Some(response.status),
        })
    }

    fn resolve_parameters(
        &mut self,
        test: &Test,
        operation: &Operation,
        operation_tag: Option<MeqaTag>,
        method: HttpMethod,
        tracker: &mut ComparisonTracker,
    ) -> Result<ResolvedParams> {
        let mut resolved = ResolvedParams::default();
        let generator = Generator::new(&self.doc, &self.config);

        for parameter in &operation.parameters {
            if parameter.location == ParamLocation::Body {
                resolved.body = Some(Self::resolve_body_param(
                    &self.doc,
                    &self.config,
                    parameter,
                    test,
                    operation_tag.clone(),
                    method,
                    &generator,
                    &mut self.rng,
                    &mut self.store,
                    tracker,
                )?);
                continue;
            }

            let user_value = user_supplied(test, parameter);
            let value = match user_value {
                Some(value) => value,
                None => {
                    let prefix = format!("{}_", parameter.name);
                    generator.generate(
                        parameter.effective_schema(),
                        operation_tag.clone(),
                        method,
                        &prefix,
                        &mut self.rng,
                        &mut self.store,
                        tracker,
                    )?
                }
            };

            let (_, param_tag) = walker::resolve(
                &self.doc,
                parameter.effective_schema(),
                operation_tag.clone(),
                &self.config,
            );
            tracker.register_basic(&param_tag.unwrap_or_default(), parameter.location, value.clone());

            resolved.insert(parameter.location, parameter.name.clone(), value);
        }

        Ok(resolved)
    }

    #[allow(clippy::too_many_arguments)]
    fn resolve_body_param(
        doc: &SwaggerDocument,
        config: &RunnerConfig,
        parameter: &Parameter,
        test: &Test,
        operation_tag: Option<MeqaTag>,
        method: HttpMethod,
        generator: &Generator<'_>,
        rng: &mut EngineRng,
        store: &mut ShadowStore,
        tracker: &mut ComparisonTracker,
    ) -> Result<Value> {
        let Some(user_body) = test.body_params.clone() else {
            let prefix = format!("{}_", parameter.name);
            return generator.generate(
                parameter.effective_schema(),
                operation_tag,
                method,
                &prefix,
                rng,
                store,
                tracker,
            );
        };

        let elements: Vec<&Value> = match &user_body {
            Value::Array(items) => items.iter().collect(),
            other => vec![other],
        };

        if let Some((tag, object_schema)) =
            walker::root_object_type(doc, parameter.effective_schema(), operation_tag, config)
        {
            let effective_method = resolve_object_method(method, &tag.operation);
            for element in elements {
                if !element.is_object() {
                    continue;
                }
                if tag.class.is_empty() {
                    debug!("skipping body element registration: no resolvable class");
                    continue;
                }
                tracker.register_object(&tag.class, effective_method, element.clone(), object_schema.clone());
            }
        }

        Ok(user_body)
    }

    async fn dispatch(&self, test: &Test, method: HttpMethod, resolved: &ResolvedParams) -> Result<crate::transport::HttpResponse> {
        let mut path = test.path.clone();
        for (name, value) in &resolved.path {
            let encoded = percent_encoding::utf8_percent_encode(&stringify(value), percent_encoding::NON_ALPHANUMERIC);
            path = path.replace(&format!("{{{name}}}"), &encoded.to_string());
        }

        let base_url = self.doc.base_url();
        let mut url: url::Url = format!("{base_url}{path}").parse()?;
        if !resolved.query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(resolved.query.iter().map(|(name, value)| (name.clone(), stringify(value))));
        }
        let url = url.to_string();

        let headers: IndexMap<String, String> = resolved
            .header
            .iter()
            .map(|(name, value)| (name.clone(), stringify(value)))
            .collect();
        let form: IndexMap<String, String> = resolved
            .form
            .iter()
            .map(|(name, value)| (name.clone(), stringify(value)))
            .collect();

        let request = HttpRequest {
            method,
            url,
            headers,
            body: resolved.body.clone(),
            form,
        };

        self.transport.send(request).await
    }

    fn validate_response(
        &self,
        operation: &Operation,
        status: u16,
        body: &[u8],
    ) -> Result<(Option<Value>, Option<String>)> {
        let response_spec = operation
            .responses
            .get(&status.to_string())
            .or_else(|| operation.responses.get("default"));

        let Some(response_spec) = response_spec else {
            return Ok((None, None));
        };

        let decoded = if let (Some(schema), false) = (response_spec.schema.as_ref(), body.is_empty()) {
            let value: Value = serde_json::from_slice(body)
                .map_err(|err| MeqaError::server_resp(format!("response body is not valid JSON: {err}")))?;
            validate::validate(schema, &value)
                .map_err(|err| MeqaError::server_resp(format!("response does not match schema: {err}")))?;
            Some(value)
        } else if !body.is_empty() {
            serde_json::from_slice(body).ok()
        } else {
            None
        };

        Ok((decoded, Some(response_spec.description.clone())))
    }

    fn reconcile(&mut self, method: HttpMethod, tracker: &ComparisonTracker, decoded_body: &Option<Value>) -> Result<()> {
        let response_array: Vec<Value> = match decoded_body {
            Some(Value::Array(items)) => items.clone(),
            Some(other) => vec![other.clone()],
            None => Vec::new(),
        };

        for (class, comparisons) in tracker.entries() {
            for comparison in comparisons {
                match method {
                    HttpMethod::Get => {
                        let key = comparison.old.clone().unwrap_or(Value::Object(Default::default()));
                        let match_fn = if comparison.old.is_none() {
                            MatchFn::MatchAlways
                        } else {
                            MatchFn::MatchAllFields
                        };
                        let found = self.store.find(class, &key, match_fn, -1);
                        if found.len() != response_array.len() {
                            return Err(MeqaError::http(format!(
                                "shadow store has {} {class} objects but response returned {}",
                                found.len(),
                                response_array.len()
                            )));
                        }
                        for element in &response_array {
                            if !found.iter().any(|stored| matches_subset(element, stored)) {
                                return Err(MeqaError::http(format!(
                                    "response element for {class} matched no shadow-store entry"
                                )));
                            }
                        }
                    }
                    HttpMethod::Delete => {
                        let key = comparison.old.clone().unwrap_or(Value::Object(Default::default()));
                        self.store.delete(class, &key, MatchFn::MatchAllFields, -1);
                    }
                    HttpMethod::Post => {
                        if let Some(new) = &comparison.new {
                            self.store.insert(class, &comparison.schema, new.clone())?;
                        }
                    }
                    HttpMethod::Put | HttpMethod::Patch => {
                        if let Some(new) = &comparison.new {
                            let key = comparison.old.clone().unwrap_or(Value::Object(Default::default()));
                            let touched = self.store.update(
                                class,
                                &key,
                                MatchFn::MatchAllFields,
                                new,
                                1,
                                method == HttpMethod::Patch,
                            );
                            if touched == 0 {
                                debug!(class, "update matched zero shadow-store rows");
                            }
                        }
                    }
                    _ => {}
                }
            }
        }

        Ok(())
    }
}

/// Resolves the effective method used for object reconciliation: an
/// explicit `@meqa[...].operation` override (a literal method name, or the
/// `read`/`write` shorthand) wins over the test's own HTTP method.
fn resolve_object_method(default: HttpMethod, operation_override: &str) -> HttpMethod {
    if operation_override.is_empty() {
        return default;
    }
    if let Some(method) = HttpMethod::parse(operation_override) {
        return method;
    }
    match operation_override.to_ascii_lowercase().as_str() {
        "write" => HttpMethod::Post,
        "read" => HttpMethod::Get,
        _ => default,
    }
}

fn determine_success(status: u16, response_description: Option<String>, test: &Test) -> Result<bool> {
    let mut success = (200..300).contains(&status);

    if let Some(description) = response_description {
        if let Some(tag) = annotation::parse(&description) {
            if tag.class == "fail" {
                success = !success;
            }
        }
    }

    if let Some(expect) = &test.expect {
        match &expect.status {
            Value::String(s) if s == "fail" => success = !success,
            Value::Number(n) => {
                let code = n
                    .as_u64()
                    .ok_or_else(|| MeqaError::invalid("expect.status must be a non-negative integer"))?;
                success = u64::from(status) == code;
            }
            other => {
                return Err(MeqaError::invalid(format!(
                    "expect.status must be \"fail\" or an integer, got {other}"
                )));
            }
        }
    }

    Ok(success)
}

/// Mirrors `MatchFn::MatchAllFields`, applied in the other direction: every
/// field of `element` must equal the corresponding field of `stored`.
fn matches_subset(element: &Value, stored: &Value) -> bool {
    let (Some(element_map), Some(stored_map)) = (element.as_object(), stored.as_object()) else {
        return element == stored;
    };
    element_map
        .iter()
        .all(|(field, value)| stored_map.get(field) == Some(value))
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn user_supplied(test: &Test, parameter: &Parameter) -> Option<Value> {
    let map = match parameter.location {
        ParamLocation::Path => &test.path_params,
        ParamLocation::Query => &test.query_params,
        ParamLocation::Header => &test.header_params,
        ParamLocation::FormData => &test.form_params,
        ParamLocation::Body => return None,
    };
    map.get(&parameter.name).cloned()
}

#[derive(Debug, Default)]
struct ResolvedParams {
    path: IndexMap<String, Value>,
    query: IndexMap<String, Value>,
    header: IndexMap<String, Value>,
    form: IndexMap<String, Value>,
    body: Option<Value>,
}

impl ResolvedParams {
    fn insert(&mut self, location: ParamLocation, name: String, value: Value) {
        match location {
            ParamLocation::Path => self.path.insert(name, value),
            ParamLocation::Query => self.query.insert(name, value),
            ParamLocation::Header => self.header.insert(name, value),
            ParamLocation::FormData => self.form.insert(name, value),
            ParamLocation::Body => return,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::model::SchemaType;
    use serde_json::json;

    #[test]
    fn resolve_object_method_prefers_literal_override() {
        assert_eq!(resolve_object_method(HttpMethod::Get, "post"), HttpMethod::Post);
    }

    #[test]
    fn resolve_object_method_understands_write_and_read_shorthand() {
        assert_eq!(resolve_object_method(HttpMethod::Get, "write"), HttpMethod::Post);
        assert_eq!(resolve_object_method(HttpMethod::Post, "read"), HttpMethod::Get);
    }

    #[test]
    fn resolve_object_method_falls_back_to_default_when_unset() {
        assert_eq!(resolve_object_method(HttpMethod::Put, ""), HttpMethod::Put);
    }

    #[test]
    fn determine_success_flips_on_expect_fail() {
        let test = Test {
            expect: Some(super::super::test::Expect { status: json!("fail") }),
            ..Default::default()
        };
        assert!(!determine_success(200, None, &test).unwrap());
        assert!(determine_success(404, None, &test).unwrap());
    }

    #[test]
    fn determine_success_forces_equality_on_integer_expect() {
        let test = Test {
            expect: Some(super::super::test::Expect { status: json!(404) }),
            ..Default::default()
        };
        assert!(determine_success(404, None, &test).unwrap());
        assert!(!determine_success(200, None, &test).unwrap());
    }

    #[test]
    fn determine_success_rejects_non_fail_string_expect() {
        let test = Test {
            expect: Some(super::super::test::Expect {
                status: json!("nope"),
            }),
            ..Default::default()
        };
        assert!(matches!(
            determine_success(200, None, &test),
            Err(MeqaError::Invalid { .. })
        ));
    }

    #[test]
    fn determine_success_flips_on_response_level_fail_annotation() {
        let test = Test::default();
        let result = determine_success(200, Some("@meqa[fail]".to_string()), &test).unwrap();
        assert!(!result);
    }

    #[test]
    fn matches_subset_checks_only_elements_fields() {
        assert!(matches_subset(&json!({"id": 7}), &json!({"id": 7, "name": "rex"})));
        assert!(!matches_subset(&json!({"id": 8}), &json!({"id": 7, "name": "rex"})));
    }

    #[test]
    fn stringify_unwraps_plain_strings_without_quotes() {
        assert_eq!(stringify(&json!("rex")), "rex");
        assert_eq!(stringify(&json!(7)), "7");
        assert_eq!(stringify(&json!(true)), "true");
    }

    #[test]
    fn user_supplied_reads_from_the_matching_location_map() {
        let mut test = Test::default();
        test.path_params.insert("id".to_string(), json!(7));

        let parameter = Parameter {
            name: "id".to_string(),
            location: ParamLocation::Path,
            required: true,
            schema: None,
            inline: crate::schema::model::SchemaNode::of_type(SchemaType::Integer),
        };
        assert_eq!(user_supplied(&test, &parameter), Some(json!(7)));
    }
}

//! Capability discovery from Swagger 2.0 / OpenAPI 3.x descriptions.
//!
//! Each (path, verb) pair of the description becomes one [`Capability`].
//! Documents may be JSON or YAML and come from a URL or a file.

use crate::capability::{Capability, Method, OffsetStyle, Parameter};
use crate::error::{QrestError, QrestResult};
use crate::naming::{self, PaginationRole};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};

// ---------------------------------------------------------------------------
// Document model. Only the parts discovery reads are modelled.
// ---------------------------------------------------------------------------

/// An API description document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiDocument {
    pub swagger: Option<String>,
    pub openapi: Option<String>,
    pub host: Option<String>,
    #[serde(rename = "basePath")]
    pub base_path: Option<String>,
    pub schemes: Vec<String>,
    pub servers: Vec<Server>,
    pub paths: BTreeMap<String, PathItem>,
    pub definitions: BTreeMap<String, Schema>,
    pub parameters: BTreeMap<String, ParameterSpec>,
    pub components: Components,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Server {
    pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Components {
    pub schemas: BTreeMap<String, Schema>,
    pub parameters: BTreeMap<String, ParameterSpec>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PathItem {
    pub get: Option<Operation>,
    pub post: Option<Operation>,
    pub put: Option<Operation>,
    pub patch: Option<Operation>,
    pub delete: Option<Operation>,
    pub parameters: Vec<ParameterSpec>,
}

impl PathItem {
    fn operation(&self, method: Method) -> Option<&Operation> {
        match method {
            Method::Get => self.get.as_ref(),
            Method::Post => self.post.as_ref(),
            Method::Put => self.put.as_ref(),
            Method::Patch => self.patch.as_ref(),
            Method::Delete => self.delete.as_ref(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Operation {
    pub parameters: Vec<ParameterSpec>,
    pub responses: BTreeMap<String, Response>,
    #[serde(rename = "requestBody")]
    pub request_body: Option<Body>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ParameterSpec {
    #[serde(rename = "$ref")]
    pub reference: Option<String>,
    pub name: String,
    #[serde(rename = "in")]
    pub location: String,
    pub required: bool,
    #[serde(rename = "type")]
    pub param_type: Option<String>,
    #[serde(rename = "enum")]
    pub enum_values: Vec<serde_json::Value>,
    pub maximum: Option<f64>,
    pub schema: Option<Schema>,
}

impl ParameterSpec {
    fn declared_type(&self) -> Option<&str> {
        self.param_type
            .as_deref()
            .or_else(|| self.schema.as_ref().and_then(|s| s.primary_type()))
    }

    fn declared_enum(&self) -> Vec<String> {
        let values = if self.enum_values.is_empty() {
            self.schema
                .as_ref()
                .map(|s| s.enum_values.as_slice())
                .unwrap_or_default()
        } else {
            self.enum_values.as_slice()
        };
        values
            .iter()
            .map(|v| match v {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect()
    }

    fn declared_maximum(&self) -> Option<f64> {
        self.maximum
            .or_else(|| self.schema.as_ref().and_then(|s| s.maximum))
    }
}

/// Swagger 2 puts the schema on the response; OpenAPI 3 under `content`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Response {
    pub schema: Option<Schema>,
    pub content: BTreeMap<String, MediaType>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Body {
    pub content: BTreeMap<String, MediaType>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MediaType {
    pub schema: Option<Schema>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SchemaType {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Schema {
    #[serde(rename = "$ref")]
    pub reference: Option<String>,
    #[serde(rename = "type")]
    pub schema_type: Option<SchemaType>,
    pub items: Option<Box<Schema>>,
    /// Kept as a JSON map so property order follows the document.
    pub properties: serde_json::Map<String, serde_json::Value>,
    #[serde(rename = "enum")]
    pub enum_values: Vec<serde_json::Value>,
    pub maximum: Option<f64>,
}

impl Schema {
    fn has_type(&self, name: &str) -> bool {
        match &self.schema_type {
            Some(SchemaType::One(t)) => t == name,
            Some(SchemaType::Many(ts)) => ts.iter().any(|t| t == name),
            None => false,
        }
    }

    fn primary_type(&self) -> Option<&str> {
        match &self.schema_type {
            Some(SchemaType::One(t)) => Some(t.as_str()),
            Some(SchemaType::Many(ts)) => ts.iter().map(String::as_str).find(|t| *t != "null"),
            None => None,
        }
    }
}

fn pick_media(content: &BTreeMap<String, MediaType>) -> Option<&Schema> {
    content
        .get("application/json")
        .or_else(|| content.values().next())
        .and_then(|m| m.schema.as_ref())
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Decode a description from JSON or YAML text.
pub fn parse_document(text: &str) -> Result<ApiDocument, String> {
    let value: serde_json::Value = if text.trim_start().starts_with('{') {
        serde_json::from_str(text).map_err(|e| format!("invalid JSON: {}", e))?
    } else {
        let yaml: serde_yaml::Value =
            serde_yaml::from_str(text).map_err(|e| format!("invalid YAML: {}", e))?;
        yaml_to_json(yaml)
    };

    if !value.is_object() {
        return Err("description is not an object".to_string());
    }
    let doc: ApiDocument =
        serde_json::from_value(value).map_err(|e| format!("unexpected document shape: {}", e))?;
    if doc.swagger.is_none() && doc.openapi.is_none() {
        return Err("missing 'swagger' or 'openapi' version field".to_string());
    }
    Ok(doc)
}

/// YAML allows non-string keys (`200:`); JSON objects do not.
fn yaml_to_json(value: serde_yaml::Value) -> serde_json::Value {
    use serde_yaml::Value as Y;
    match value {
        Y::Null => serde_json::Value::Null,
        Y::Bool(b) => serde_json::Value::Bool(b),
        Y::Number(n) => {
            if let Some(i) = n.as_i64() {
                serde_json::Value::from(i)
            } else if let Some(u) = n.as_u64() {
                serde_json::Value::from(u)
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(serde_json::Value::Number)
                    .unwrap_or(serde_json::Value::Null)
            }
        }
        Y::String(s) => serde_json::Value::String(s),
        Y::Sequence(seq) => serde_json::Value::Array(seq.into_iter().map(yaml_to_json).collect()),
        Y::Mapping(map) => {
            let mut out = serde_json::Map::new();
            for (k, v) in map {
                let key = match k {
                    Y::String(s) => s,
                    Y::Number(n) => n.to_string(),
                    Y::Bool(b) => b.to_string(),
                    other => serde_yaml::to_string(&other)
                        .unwrap_or_default()
                        .trim()
                        .to_string(),
                };
                out.insert(key, yaml_to_json(v));
            }
            serde_json::Value::Object(out)
        }
        Y::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Fetch and decode a description from a URL or a file path.
pub async fn load_document(source: &str) -> QrestResult<ApiDocument> {
    let text = if is_remote(source) {
        debug!("Fetching API description from {}", source);
        let response = reqwest::get(source)
            .await
            .map_err(|e| QrestError::discovery(source, e))?
            .error_for_status()
            .map_err(|e| QrestError::discovery(source, e))?;
        response
            .text()
            .await
            .map_err(|e| QrestError::discovery(source, e))?
    } else {
        tokio::fs::read_to_string(source)
            .await
            .map_err(|e| QrestError::discovery(source, e))?
    };

    parse_document(&text).map_err(|e| QrestError::discovery(source, e))
}

/// Load a description and discover its capabilities.
///
/// `base_url` overrides the address declared in the document.
pub async fn parse_capabilities(source: &str, base_url: Option<&str>) -> QrestResult<Vec<Capability>> {
    let doc = load_document(source).await?;
    let base = match base_url {
        Some(url) if !url.is_empty() => url.to_string(),
        _ => declared_base_url(&doc, source),
    };
    let capabilities = Discovery::new(&doc, base).capabilities();
    info!(
        "Discovered {} capabilities from {}",
        capabilities.len(),
        source
    );
    Ok(capabilities)
}

/// Base address declared by the document itself.
pub fn declared_base_url(doc: &ApiDocument, source: &str) -> String {
    if let Some(server) = doc.servers.first() {
        let url = server.url.trim_end_matches('/');
        if is_remote(url) || !is_remote(source) {
            return url.to_string();
        }
        // Relative server URL: resolve against where the document came from.
        return url::Url::parse(source)
            .and_then(|base| base.join(url))
            .map(|u| u.as_str().trim_end_matches('/').to_string())
            .unwrap_or_else(|_| url.to_string());
    }

    match &doc.host {
        Some(host) => {
            let scheme = doc.schemes.first().map(String::as_str).unwrap_or("https");
            let base_path = doc.base_path.as_deref().unwrap_or("");
            format!("{}://{}{}", scheme, host, base_path.trim_end_matches('/'))
        }
        None => String::new(),
    }
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// Turns one description into capabilities.
pub struct Discovery<'a> {
    doc: &'a ApiDocument,
    base_url: String,
}

impl<'a> Discovery<'a> {
    pub fn new(doc: &'a ApiDocument, base_url: impl Into<String>) -> Self {
        Self {
            doc,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// One capability per (path, verb), in path order then verb order.
    pub fn capabilities(&self) -> Vec<Capability> {
        let mut capabilities = Vec::new();
        let mut taken: HashSet<String> = HashSet::new();

        for (path, item) in &self.doc.paths {
            for method in Method::ALL {
                let Some(operation) = item.operation(method) else {
                    continue;
                };
                let Some(resource) = extract_table_name(path) else {
                    debug!("No resource segment in {}; skipping {}", path, method);
                    continue;
                };

                let table = unique_table_name(resource, path, method, &taken);
                taken.insert(table.clone());
                capabilities.push(self.parse_operation(path, method, table, item, operation));
            }
        }

        capabilities
    }

    fn parse_operation(
        &self,
        path: &str,
        method: Method,
        table: String,
        item: &PathItem,
        operation: &Operation,
    ) -> Capability {
        let mut cap = Capability::new(path, method, table);
        cap.base_url = self.base_url.clone();

        for spec in self.merged_parameters(item, operation) {
            match spec.location.as_str() {
                "query" => self.add_query_parameter(&mut cap, spec),
                "body" => {
                    if let Some(schema) = &spec.schema {
                        cap.body_columns = self.extract_columns(schema, false);
                    }
                }
                "formData" => cap.body_columns.push(spec.name.clone()),
                _ => {}
            }
        }

        if let Some(schema) = operation
            .request_body
            .as_ref()
            .and_then(|b| pick_media(&b.content))
        {
            cap.body_columns = self.extract_columns(schema, false);
        }

        cap.response_columns = self.response_columns(operation);
        debug!(
            table = %cap.table,
            params = cap.parameters.len(),
            columns = cap.response_columns.len(),
            "Parsed {} {}",
            method,
            path
        );
        cap
    }

    fn add_query_parameter(&self, cap: &mut Capability, spec: &ParameterSpec) {
        let mut param = Parameter::query(spec.name.clone(), spec.declared_type());
        param.required = spec.required;
        param.enum_values = spec.declared_enum();

        match naming::pagination_role(&param.name) {
            Some(PaginationRole::Limit) if cap.limit_param.is_none() => {
                cap.has_paging = true;
                cap.limit_param = Some(param.name.clone());
                if let Some(max) = spec.declared_maximum().filter(|m| *m >= 1.0) {
                    cap.max_results = max as usize;
                }
            }
            Some(role @ (PaginationRole::Offset | PaginationRole::Page))
                if cap.offset_param.is_none() =>
            {
                cap.has_paging = true;
                cap.offset_param = Some(param.name.clone());
                cap.offset_style = if role == PaginationRole::Page {
                    OffsetStyle::Page
                } else {
                    OffsetStyle::Items
                };
            }
            _ => {}
        }

        cap.parameters.push(param);
    }

    /// Path-level parameters overlaid by operation-level ones, `$ref`s resolved.
    fn merged_parameters<'s>(&'s self, item: &'s PathItem, operation: &'s Operation) -> Vec<&'s ParameterSpec> {
        let mut merged: Vec<&ParameterSpec> = Vec::new();
        for spec in item.parameters.iter().chain(&operation.parameters) {
            let Some(spec) = self.resolve_parameter(spec) else {
                continue;
            };
            match merged
                .iter()
                .position(|p| p.name == spec.name && p.location == spec.location)
            {
                Some(i) => merged[i] = spec,
                None => merged.push(spec),
            }
        }
        merged
    }

    fn resolve_parameter<'s>(&'s self, spec: &'s ParameterSpec) -> Option<&'s ParameterSpec> {
        let Some(reference) = &spec.reference else {
            return Some(spec);
        };
        let name = reference.rsplit('/').next()?;
        self.doc
            .parameters
            .get(name)
            .or_else(|| self.doc.components.parameters.get(name))
    }

    fn response_columns(&self, operation: &Operation) -> Vec<String> {
        let success = operation
            .responses
            .iter()
            .find(|(code, _)| code.starts_with('2'))
            .or_else(|| operation.responses.get_key_value("default"))
            .map(|(_, r)| r);

        let Some(response) = success else {
            return Vec::new();
        };
        let schema = response
            .schema
            .as_ref()
            .or_else(|| pick_media(&response.content));

        schema
            .map(|s| self.extract_columns(s, false))
            .unwrap_or_default()
    }

    /// Column names of a schema. References are followed one level only.
    fn extract_columns(&self, schema: &Schema, resolved: bool) -> Vec<String> {
        if let Some(reference) = &schema.reference {
            if resolved {
                return Vec::new();
            }
            return self
                .resolve_schema(reference)
                .map(|s| self.extract_columns(s, true))
                .unwrap_or_default();
        }

        if schema.has_type("array") {
            return schema
                .items
                .as_deref()
                .map(|items| self.extract_columns(items, resolved))
                .unwrap_or_default();
        }

        if schema.has_type("object") || schema.schema_type.is_none() {
            return schema.properties.keys().cloned().collect();
        }

        Vec::new()
    }

    fn resolve_schema(&self, reference: &str) -> Option<&Schema> {
        let name = reference.rsplit('/').next()?;
        self.doc
            .definitions
            .get(name)
            .or_else(|| self.doc.components.schemas.get(name))
    }
}

/// Resource name of a path: the last segment that is neither a placeholder
/// nor a prefix/version token.
pub fn extract_table_name(path: &str) -> Option<&str> {
    path.trim_start_matches('/')
        .split('/')
        .rev()
        .filter(|seg| !seg.is_empty())
        .filter(|seg| !seg.starts_with('{') && !seg.ends_with('}'))
        .find(|seg| !naming::is_path_prefix(seg))
}

/// Verb-qualified table name, disambiguated against names already taken.
///
/// `/pets` and `/pets/{id}` both name `pets`; the second becomes `pets_by_id`.
fn unique_table_name(resource: &str, path: &str, method: Method, taken: &HashSet<String>) -> String {
    let suffix = method.table_suffix().unwrap_or("");
    let candidate = format!("{}{}", resource, suffix);
    if !taken.contains(&candidate) {
        return candidate;
    }

    let params = crate::capability::placeholders(path);
    let qualified = if params.is_empty() {
        resource.to_string()
    } else {
        format!("{}_by_{}", resource, params.join("_and_"))
    };
    let candidate = format!("{}{}", qualified, suffix);
    if !taken.contains(&candidate) {
        return candidate;
    }

    (2..)
        .map(|n| format!("{}_{}{}", qualified, n, suffix))
        .find(|c| !taken.contains(c))
        .unwrap_or(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PETSTORE: &str = r##"{
      "swagger": "2.0",
      "host": "petstore.example.com",
      "basePath": "/v2",
      "schemes": ["https"],
      "paths": {
        "/pet/findByStatus": {
          "get": {
            "parameters": [
              {"name": "status", "in": "query", "type": "string", "required": true,
               "enum": ["available", "pending", "sold"]}
            ],
            "responses": {
              "200": {"schema": {"type": "array", "items": {"$ref": "#/definitions/Pet"}}}
            }
          }
        },
        "/pet/{petId}": {
          "get": {
            "parameters": [{"name": "petId", "in": "path", "type": "integer", "required": true}],
            "responses": {"200": {"schema": {"$ref": "#/definitions/Pet"}}}
          },
          "delete": {
            "parameters": [{"name": "petId", "in": "path", "type": "integer", "required": true}],
            "responses": {"400": {"description": "bad id"}}
          }
        }
      },
      "definitions": {
        "Pet": {
          "type": "object",
          "properties": {"id": {"type": "integer"}, "name": {"type": "string"}, "status": {"type": "string"}}
        }
      }
    }"##;

    fn petstore() -> ApiDocument {
        parse_document(PETSTORE).unwrap()
    }

    #[test]
    fn test_extract_table_name() {
        assert_eq!(extract_table_name("/users"), Some("users"));
        assert_eq!(extract_table_name("/api/v1/users"), Some("users"));
        assert_eq!(extract_table_name("/users/{id}"), Some("users"));
        assert_eq!(extract_table_name("/pet/findByStatus"), Some("findByStatus"));
        assert_eq!(extract_table_name("/api/v2/{id}"), None);
        assert_eq!(extract_table_name("/"), None);
    }

    #[test]
    fn test_declared_base_url_swagger2() {
        assert_eq!(
            declared_base_url(&petstore(), "petstore.json"),
            "https://petstore.example.com/v2"
        );
    }

    #[test]
    fn test_relative_server_url_resolves_against_source() {
        let doc = parse_document(r#"{"openapi": "3.0.0", "servers": [{"url": "/api/v3"}], "paths": {}}"#)
            .unwrap();
        assert_eq!(
            declared_base_url(&doc, "https://example.com/openapi.json"),
            "https://example.com/api/v3"
        );
    }

    #[test]
    fn test_capabilities_from_swagger2() {
        let doc = petstore();
        let caps = Discovery::new(&doc, "https://petstore.example.com/v2").capabilities();
        let tables: Vec<&str> = caps.iter().map(|c| c.table.as_str()).collect();
        assert_eq!(tables, vec!["findByStatus", "pet", "pet_delete"]);

        let find = &caps[0];
        assert_eq!(find.method, Method::Get);
        assert_eq!(find.response_columns, vec!["id", "name", "status"]);
        assert_eq!(find.parameters.len(), 1);
        assert_eq!(find.parameters[0].enum_values, vec!["available", "pending", "sold"]);
        assert!(find.parameters[0].required);
    }

    #[test]
    fn test_path_parameters_are_not_query_parameters() {
        let doc = petstore();
        let caps = Discovery::new(&doc, "").capabilities();
        let by_id = caps.iter().find(|c| c.table == "pet").unwrap();
        assert!(by_id.parameters.is_empty());
        assert_eq!(by_id.path_params, vec!["petId"]);
        assert_eq!(by_id.response_columns, vec!["id", "name", "status"]);
    }

    #[test]
    fn test_unresolvable_response_is_empty() {
        let doc = petstore();
        let caps = Discovery::new(&doc, "").capabilities();
        let delete = caps.iter().find(|c| c.table == "pet_delete").unwrap();
        assert!(delete.response_columns.is_empty());
    }

    #[test]
    fn test_reference_resolved_one_level_only() {
        let doc = parse_document(
            r##"{
              "swagger": "2.0",
              "paths": {"/things": {"get": {"responses": {"200": {"schema": {"$ref": "#/definitions/ThingList"}}}}}},
              "definitions": {
                "ThingList": {"type": "array", "items": {"$ref": "#/definitions/Thing"}},
                "Thing": {"type": "object", "properties": {"id": {"type": "integer"}}}
              }
            }"##,
        )
        .unwrap();
        let caps = Discovery::new(&doc, "").capabilities();
        assert!(caps[0].response_columns.is_empty());
    }

    #[test]
    fn test_pagination_detection() {
        let doc = parse_document(
            r#"{
              "swagger": "2.0",
              "paths": {"/users": {"get": {"parameters": [
                {"name": "per_page", "in": "query", "type": "integer", "maximum": 100},
                {"name": "page", "in": "query", "type": "integer"},
                {"name": "age_gt", "in": "query", "type": "integer"}
              ], "responses": {}}}}
            }"#,
        )
        .unwrap();
        let caps = Discovery::new(&doc, "").capabilities();
        let users = &caps[0];
        assert!(users.has_paging);
        assert_eq!(users.limit_param.as_deref(), Some("per_page"));
        assert_eq!(users.offset_param.as_deref(), Some("page"));
        assert_eq!(users.offset_style, OffsetStyle::Page);
        assert_eq!(users.max_results, 100);
        assert_eq!(users.parameters.len(), 3);
    }

    #[test]
    fn test_duplicate_resource_names_are_disambiguated() {
        let doc = parse_document(
            r#"{
              "swagger": "2.0",
              "paths": {
                "/pets": {"get": {"responses": {}}},
                "/pets/{id}": {"get": {"responses": {}}, "put": {"responses": {}}}
              }
            }"#,
        )
        .unwrap();
        let caps = Discovery::new(&doc, "").capabilities();
        let tables: Vec<&str> = caps.iter().map(|c| c.table.as_str()).collect();
        assert_eq!(tables, vec!["pets", "pets_by_id", "pets_put"]);
    }

    #[test]
    fn test_openapi3_yaml() {
        let doc = parse_document(
            r#"
openapi: 3.0.1
servers:
  - url: https://api.example.com/
paths:
  /api/v1/orders:
    parameters:
      - name: status
        in: query
        schema:
          type: string
          enum: [open, closed]
    get:
      parameters:
        - $ref: '#/components/parameters/Limit'
      responses:
        200:
          content:
            application/json:
              schema:
                type: object
                properties:
                  id: {type: integer}
                  total: {type: number}
    post:
      requestBody:
        content:
          application/json:
            schema:
              $ref: '#/components/schemas/NewOrder'
      responses:
        '201':
          description: created
components:
  parameters:
    Limit:
      name: limit
      in: query
      schema:
        type: integer
        maximum: 50
  schemas:
    NewOrder:
      properties:
        total: {type: number}
        note: {type: string}
"#,
        )
        .unwrap();

        assert_eq!(declared_base_url(&doc, "spec.yaml"), "https://api.example.com");

        let caps = Discovery::new(&doc, "https://api.example.com").capabilities();
        assert_eq!(caps.len(), 2);

        let get = &caps[0];
        assert_eq!(get.table, "orders");
        assert_eq!(get.response_columns, vec!["id", "total"]);
        let names: Vec<&str> = get.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["status", "limit"]);
        assert_eq!(get.parameters[0].enum_values, vec!["open", "closed"]);
        assert_eq!(get.limit_param.as_deref(), Some("limit"));
        assert_eq!(get.max_results, 50);

        let post = &caps[1];
        assert_eq!(post.table, "orders_post");
        assert_eq!(post.body_columns, vec!["total", "note"]);
        assert!(post.response_columns.is_empty());
    }

    #[test]
    fn test_rejects_non_description() {
        assert!(parse_document("{\"hello\": 1}").is_err());
        assert!(parse_document("[1, 2]").is_err());
        assert!(parse_document("{not json").is_err());
    }
}

use serde_json::{Value, json};

use crate::generator::{
  context::ResolutionContext,
  ir::{
    IrArena, IrKind, PrimitiveType,
    endpoints::{Endpoint, EndpointTranspiler, HttpMethod, ParameterLocation, UNKNOWN_ALIAS, is_json_media_type},
  },
  metrics::PipelineWarning,
  tests::support::{document_with_paths, kind, named},
};

fn transpile_endpoints(doc: Value) -> (IrArena, Vec<Endpoint>, Vec<PipelineWarning>) {
  let context = ResolutionContext::new(doc).expect("graph builds");
  let mut transpiler = context.transpiler();
  transpiler.transpile_components().expect("components transpile");
  let (endpoints, warnings) = EndpointTranspiler::new(&mut transpiler)
    .transpile_all()
    .expect("endpoints transpile");
  let (arena, _) = transpiler.finish();
  (arena, endpoints, warnings)
}

fn pets_api() -> Value {
  document_with_paths(
    json!({
      "/pets/{petId}": {
        "parameters": [
          { "name": "petId", "in": "path", "required": true, "schema": { "type": "string" } },
          { "name": "verbose", "in": "query", "schema": { "type": "boolean" } }
        ],
        "get": {
          "operationId": "showPetById",
          "parameters": [
            { "name": "petId", "in": "path", "required": true, "schema": { "type": "integer" } },
            { "name": "limit", "in": "query", "schema": { "type": "integer" } }
          ],
          "responses": {
            "200": {
              "description": "ok",
              "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Pet" } } }
            },
            "404": { "description": "missing" },
            "default": {
              "description": "error",
              "content": { "application/json": { "schema": { "type": "object" } } }
            }
          }
        },
        "delete": {
          "responses": { "204": { "description": "gone" } }
        }
      }
    }),
    json!({
      "Pet": { "type": "object", "properties": { "name": { "type": "string" } } }
    }),
  )
}

#[test]
fn test_operations_in_method_order() {
  let (_, endpoints, warnings) = transpile_endpoints(pets_api());

  let methods: Vec<HttpMethod> = endpoints.iter().map(|endpoint| endpoint.method).collect();
  assert_eq!(methods, vec![HttpMethod::Get, HttpMethod::Delete]);
  assert!(endpoints.iter().all(|endpoint| endpoint.path == "/pets/{petId}"));
  assert!(warnings.is_empty());
}

#[test]
fn test_operation_parameters_override_path_parameters() {
  let (arena, endpoints, _) = transpile_endpoints(pets_api());
  let show = &endpoints[0];

  let names: Vec<(&str, ParameterLocation)> = show
    .parameters
    .iter()
    .map(|parameter| (parameter.name.as_str(), parameter.location))
    .collect();
  assert_eq!(
    names,
    vec![
      ("petId", ParameterLocation::Path),
      ("verbose", ParameterLocation::Query),
      ("limit", ParameterLocation::Query),
    ]
  );

  let pet_id = show.parameters[0].schema.expect("petId has a schema");
  assert!(show.parameters[0].required);
  assert!(matches!(
    kind(&arena, pet_id),
    IrKind::Primitive {
      primitive: PrimitiveType::Integer,
      ..
    }
  ));
  assert_eq!(arena.name(pet_id), "ShowPetByIdPetId");
  assert!(!show.parameters[1].required);
}

#[test]
fn test_override_takes_operation_required_flag() {
  let doc = document_with_paths(
    json!({
      "/things/{foo}": {
        "parameters": [{ "name": "foo", "in": "path", "required": true, "schema": { "type": "string" } }],
        "get": {
          "operationId": "getThing",
          "parameters": [{ "name": "foo", "in": "path", "schema": { "type": "string" } }],
          "responses": {}
        }
      }
    }),
    json!({}),
  );
  let (_, endpoints, _) = transpile_endpoints(doc);
  let parameters = &endpoints[0].parameters;

  assert_eq!(parameters.len(), 1);
  assert_eq!(parameters[0].location, ParameterLocation::Path);
  assert!(!parameters[0].required);
}

#[test]
fn test_responses_skip_default() {
  let (arena, endpoints, _) = transpile_endpoints(pets_api());
  let show = &endpoints[0];

  let statuses: Vec<&str> = show.responses.iter().map(|response| response.status.as_str()).collect();
  assert_eq!(statuses, vec!["200", "404"]);
  assert_eq!(show.responses[0].schema, Some(named(&arena, "Pet")));
  assert_eq!(show.responses[0].media_type.as_deref(), Some("application/json"));
  assert_eq!(show.responses[1].schema, None);
}

#[test]
fn test_missing_operation_id_uses_sentinel_alias() {
  let (_, endpoints, _) = transpile_endpoints(pets_api());
  let delete = &endpoints[1];

  assert_eq!(endpoints[0].alias, "showPetById");
  assert_eq!(delete.alias, UNKNOWN_ALIAS);
  assert_eq!(delete.responses.len(), 1);
}

#[test]
fn test_request_body_prefers_json_content() {
  let doc = document_with_paths(
    json!({
      "/pets": {
        "post": {
          "operationId": "createPet",
          "requestBody": {
            "required": true,
            "content": {
              "application/xml": { "schema": { "type": "string" } },
              "application/vnd.api+json": {
                "schema": { "type": "object", "properties": { "name": { "type": "string" } } }
              }
            }
          },
          "responses": { "201": { "description": "created" } }
        },
        "put": {
          "operationId": "replacePet",
          "requestBody": { "content": { "text/plain": { "schema": { "type": "string" } } } },
          "responses": {}
        }
      }
    }),
    json!({}),
  );
  let (arena, endpoints, warnings) = transpile_endpoints(doc);

  let create = endpoints.iter().find(|endpoint| endpoint.alias == "createPet").unwrap();
  let body = create.request_body.as_ref().expect("JSON body");
  assert!(body.required);
  assert_eq!(body.media_type, "application/vnd.api+json");
  assert_eq!(arena.name(body.schema), "CreatePetRequest");
  assert!(matches!(kind(&arena, body.schema), IrKind::Object(_)));

  let replace = endpoints.iter().find(|endpoint| endpoint.alias == "replacePet").unwrap();
  assert!(replace.request_body.is_none());
  assert_eq!(
    warnings,
    vec![PipelineWarning::NonJsonContent {
      method: "put".to_string(),
      path: "/pets".to_string(),
      location: "requestBody".to_string(),
    }]
  );
}

#[test]
fn test_referenced_parameters_share_one_schema() {
  let mut doc = document_with_paths(
    json!({
      "/pets": {
        "get": {
          "parameters": [{ "$ref": "#/components/parameters/Limit" }],
          "responses": {}
        }
      },
      "/owners": {
        "get": {
          "operationId": "listOwners",
          "parameters": [{ "$ref": "#/components/parameters/Limit" }],
          "responses": {}
        }
      }
    }),
    json!({}),
  );
  doc["components"]["parameters"] = json!({
    "Limit": { "name": "limit", "in": "query", "schema": { "type": "integer", "minimum": 1 } }
  });
  let (arena, endpoints, _) = transpile_endpoints(doc);

  let first = endpoints[0].parameters[0].schema.unwrap();
  let second = endpoints[1].parameters[0].schema.unwrap();
  assert_eq!(first, second);
  assert_eq!(endpoints[0].parameters[0].name, "limit");
  assert_eq!(arena.name(first), "GetPetsLimit");
}

#[test]
fn test_json_media_types() {
  assert!(is_json_media_type("application/json"));
  assert!(is_json_media_type("application/json; charset=utf-8"));
  assert!(is_json_media_type("application/problem+json"));
  assert!(!is_json_media_type("application/xml"));
  assert!(!is_json_media_type("text/plain"));
  assert!(!is_json_media_type("multipart/form-data"));
  assert!(!is_json_media_type("not a media type"));
}

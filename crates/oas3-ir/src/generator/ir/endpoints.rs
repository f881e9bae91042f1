use mediatype::MediaType;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

use super::{IrId, transpiler::Transpiler};
use crate::{
  error::{Result, SchemaContext},
  generator::{
    metrics::PipelineWarning,
    naming::identifiers::{generate_operation_id, to_type_name},
  },
  utils::refs::join_pointer,
};

/// Alias given to operations without an `operationId`.
pub const UNKNOWN_ALIAS: &str = "unknown";

const DEFAULT_STATUS: &str = "default";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum HttpMethod {
  Get,
  Post,
  Put,
  Patch,
  Delete,
}

impl HttpMethod {
  pub const ALL: [HttpMethod; 5] = [Self::Get, Self::Post, Self::Put, Self::Patch, Self::Delete];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ParameterLocation {
  Path,
  Query,
  Header,
  Cookie,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Parameter {
  pub name: String,
  pub location: ParameterLocation,
  pub required: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub schema: Option<IrId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestBody {
  pub required: bool,
  pub media_type: String,
  pub schema: IrId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Response {
  pub status: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub media_type: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub schema: Option<IrId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Endpoint {
  /// The `operationId`, or [`UNKNOWN_ALIAS`].
  pub alias: String,
  pub method: HttpMethod,
  pub path: String,
  pub parameters: Vec<Parameter>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub request_body: Option<RequestBody>,
  pub responses: Vec<Response>,
}

/// A parameter object resolved from the document, before its schema is
/// transpiled.
struct RawParameter<'a> {
  id: String,
  name: String,
  location: ParameterLocation,
  required: bool,
  schema: Option<&'a Value>,
}

impl RawParameter<'_> {
  fn key(&self) -> (&str, ParameterLocation) {
    (&self.name, self.location)
  }
}

/// Converts every supported operation under `paths` into an [`Endpoint`],
/// transpiling body and parameter schemas through the shared transpiler.
pub struct EndpointTranspiler<'t, 'a> {
  schemas: &'t mut Transpiler<'a>,
  warnings: Vec<PipelineWarning>,
}

impl<'t, 'a> EndpointTranspiler<'t, 'a> {
  pub fn new(schemas: &'t mut Transpiler<'a>) -> Self {
    Self {
      schemas,
      warnings: vec![],
    }
  }

  pub fn transpile_all(mut self) -> Result<(Vec<Endpoint>, Vec<PipelineWarning>)> {
    let document = self.schemas.resolver().document();
    let Some(paths) = document.get("paths").and_then(Value::as_object) else {
      return Ok((vec![], self.warnings));
    };

    let mut endpoints = vec![];
    for (path, item) in paths {
      let item_location = join_pointer("#/paths", [path]);
      let item = self.schemas.resolver().resolve(item, &item_location)?;
      let shared = self.raw_parameters(item.schema, &item.id).in_schema(&item.id)?;

      for method in HttpMethod::ALL {
        let Some(operation) = item.schema.get(method.to_string()) else {
          continue;
        };
        let location = join_pointer(&item.id, [method.to_string()]);
        let endpoint = self
          .endpoint(method, path, operation, &location, &shared)
          .in_schema(&location)?;
        endpoints.push(endpoint);
      }
    }
    Ok((endpoints, self.warnings))
  }

  fn endpoint(
    &mut self,
    method: HttpMethod,
    path: &str,
    operation: &'a Value,
    location: &str,
    shared: &[RawParameter<'a>],
  ) -> Result<Endpoint> {
    let operation_id = operation.get("operationId").and_then(Value::as_str);
    let alias = operation_id.unwrap_or(UNKNOWN_ALIAS).to_string();
    let type_base = to_type_name(
      &operation_id
        .map(String::from)
        .unwrap_or_else(|| generate_operation_id(&method.to_string(), path)),
    );

    let own = self.raw_parameters(operation, location)?;
    let mut merged: Vec<&RawParameter<'a>> = shared.iter().collect();
    for parameter in &own {
      match merged.iter().position(|existing| existing.key() == parameter.key()) {
        Some(index) => merged[index] = parameter,
        None => merged.push(parameter),
      }
    }

    let mut parameters = Vec::with_capacity(merged.len());
    for raw in merged {
      let schema = match raw.schema {
        Some(schema) => Some(self.schemas.transpile(
          &format!("{type_base}{}", to_type_name(&raw.name)),
          schema,
          &join_pointer(&raw.id, ["schema"]),
        )?),
        None => None,
      };
      parameters.push(Parameter {
        name: raw.name.clone(),
        location: raw.location,
        required: raw.required,
        schema,
      });
    }

    let request_body = match operation.get("requestBody") {
      Some(body) => self.request_body(method, path, body, &join_pointer(location, ["requestBody"]), &type_base)?,
      None => None,
    };

    let mut responses = vec![];
    if let Some(statuses) = operation.get("responses").and_then(Value::as_object) {
      for (status, response) in statuses {
        if status == DEFAULT_STATUS {
          continue;
        }
        let response_location = join_pointer(location, ["responses", status]);
        let name = format!("{type_base}{status}Response");
        responses.push(self.response(method, path, status, response, &response_location, &name)?);
      }
    }

    Ok(Endpoint {
      alias,
      method,
      path: path.to_string(),
      parameters,
      request_body,
      responses,
    })
  }

  fn raw_parameters(&self, owner: &'a Value, location: &str) -> Result<Vec<RawParameter<'a>>> {
    let Some(parameters) = owner.get("parameters").and_then(Value::as_array) else {
      return Ok(vec![]);
    };

    let mut raw = Vec::with_capacity(parameters.len());
    for (index, parameter) in parameters.iter().enumerate() {
      let parameter_location = join_pointer(location, ["parameters".to_string(), index.to_string()]);
      let resolved = self.schemas.resolver().resolve(parameter, &parameter_location)?;
      let (Some(name), Some(place)) = (
        resolved.schema.get("name").and_then(Value::as_str),
        resolved
          .schema
          .get("in")
          .and_then(|place| serde_json::from_value::<ParameterLocation>(place.clone()).ok()),
      ) else {
        continue;
      };

      raw.push(RawParameter {
        id: resolved.id,
        name: name.to_string(),
        location: place,
        required: resolved.schema.get("required").and_then(Value::as_bool).unwrap_or(false),
        schema: resolved.schema.get("schema").filter(|schema| schema.is_object()),
      });
    }
    Ok(raw)
  }

  fn request_body(
    &mut self,
    method: HttpMethod,
    path: &str,
    body: &'a Value,
    location: &str,
    type_base: &str,
  ) -> Result<Option<RequestBody>> {
    let body = self.schemas.resolver().resolve(body, location)?;
    let Some((media_type, schema)) = self.json_content(method, path, body.schema, "requestBody") else {
      return Ok(None);
    };

    let schema_location = join_pointer(&body.id, ["content", media_type, "schema"]);
    let schema = self
      .schemas
      .transpile(&format!("{type_base}Request"), schema, &schema_location)?;
    Ok(Some(RequestBody {
      required: body.schema.get("required").and_then(Value::as_bool).unwrap_or(false),
      media_type: media_type.to_string(),
      schema,
    }))
  }

  fn response(
    &mut self,
    method: HttpMethod,
    path: &str,
    status: &str,
    response: &'a Value,
    location: &str,
    name: &str,
  ) -> Result<Response> {
    let response = self.schemas.resolver().resolve(response, location)?;
    let content = self.json_content(method, path, response.schema, &format!("responses/{status}"));

    let (media_type, schema) = match content {
      Some((media_type, schema)) => {
        let schema_location = join_pointer(&response.id, ["content", media_type, "schema"]);
        let schema = self.schemas.transpile(name, schema, &schema_location)?;
        (Some(media_type.to_string()), Some(schema))
      }
      None => (None, None),
    };

    Ok(Response {
      status: status.to_string(),
      media_type,
      schema,
    })
  }

  /// The first JSON media type of a `content` map and its schema.
  ///
  /// Records a warning when content exists but none of it is JSON.
  fn json_content(
    &mut self,
    method: HttpMethod,
    path: &str,
    owner: &'a Value,
    position: &str,
  ) -> Option<(&'a str, &'a Value)> {
    let content = owner.get("content").and_then(Value::as_object)?;
    let found = content
      .iter()
      .find(|(media_type, _)| is_json_media_type(media_type))
      .and_then(|(media_type, media)| media.get("schema").map(|schema| (media_type.as_str(), schema)));

    if found.is_none() && !content.is_empty() {
      self.warnings.push(PipelineWarning::NonJsonContent {
        method: method.to_string(),
        path: path.to_string(),
        location: position.to_string(),
      });
    }
    found
  }
}

/// `application/json` and any `+json` structured suffix.
pub fn is_json_media_type(content_type: &str) -> bool {
  let Ok(media) = MediaType::parse(content_type) else {
    return false;
  };
  let suffix = media.suffix.as_ref().map(mediatype::Name::as_str);
  match (media.ty.as_str(), media.subty.as_str(), suffix) {
    (_, _, Some(suffix)) => suffix.eq_ignore_ascii_case("json"),
    (ty, subty, None) => ty.eq_ignore_ascii_case("application") && subty.eq_ignore_ascii_case("json"),
  }
}

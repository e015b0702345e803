use crate::value::ScriptValue;
use rquickjs::{Ctx, Error, FromJs, IntoJs, Value};

impl<'js> IntoJs<'js> for ScriptValue {
    fn into_js(self, ctx: &Ctx<'js>) -> rquickjs::Result<Value<'js>> {
        match self {
            ScriptValue::Unit => Ok(Value::new_undefined(ctx.clone())),
            ScriptValue::Int(v) => v.into_js(ctx),
            ScriptValue::Float(v) => f64::from(v).into_js(ctx),
            ScriptValue::Bool(v) => v.into_js(ctx),
            ScriptValue::Str(v) => v.into_js(ctx),
            ScriptValue::Entity(id) => id.raw().into_js(ctx),
        }
    }
}

impl<'js> FromJs<'js> for ScriptValue {
    fn from_js(_ctx: &Ctx<'js>, value: Value<'js>) -> rquickjs::Result<Self> {
        if value.is_undefined() || value.is_null() {
            return Ok(ScriptValue::Unit);
        }
        if let Some(v) = value.as_bool() {
            return Ok(ScriptValue::Bool(v));
        }
        if let Some(v) = value.as_int() {
            return Ok(ScriptValue::Int(v));
        }
        if let Some(v) = value.as_float() {
            return Ok(ScriptValue::Float(v as f32));
        }
        if let Some(v) = value.as_string() {
            return Ok(ScriptValue::Str(v.to_string()?));
        }
        Err(Error::new_from_js(value.type_name(), "ScriptValue"))
    }
}

/// Message of the pending exception after a failed call.
pub(crate) fn exception_message(ctx: &Ctx<'_>, err: Error) -> String {
    if !matches!(err, Error::Exception) {
        return err.to_string();
    }
    let caught = ctx.catch();
    if let Some(exception) = caught.as_exception() {
        return exception
            .message()
            .unwrap_or_else(|| "exception without message".to_string());
    }
    caught
        .as_string()
        .and_then(|s| s.to_string().ok())
        .unwrap_or_else(|| format!("thrown {}", caught.type_name()))
}

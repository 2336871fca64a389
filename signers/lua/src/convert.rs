//! Moving values between JSON maps and Lua tables.

use anyhow::{bail, Result};
use mlua::{Lua, Table, Value as LuaValue};
use reqcall_core::Header;
use serde_json::{Map, Number, Value};

use crate::constants::MAX_TABLE_DEPTH;

/// Build a Lua table from a JSON object.
///
/// Strings, numbers, booleans and nested objects are copied; integers stay
/// Lua integers. Arrays and nulls are skipped.
pub fn to_lua_table<'lua>(lua: &'lua Lua, map: &Map<String, Value>) -> mlua::Result<Table<'lua>> {
    let table = lua.create_table()?;
    for (k, v) in map {
        let v = match v {
            Value::String(s) => LuaValue::String(lua.create_string(s)?),
            Value::Bool(b) => LuaValue::Boolean(*b),
            Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => LuaValue::Integer(i),
                (None, Some(f)) => LuaValue::Number(f),
                (None, None) => continue,
            },
            Value::Object(m) => LuaValue::Table(to_lua_table(lua, m)?),
            Value::Array(_) | Value::Null => continue,
        };
        table.raw_set(k.as_str(), v)?;
    }
    Ok(table)
}

/// Build a Lua table of string values from headers.
pub fn header_to_lua_table<'lua>(lua: &'lua Lua, header: &Header) -> mlua::Result<Table<'lua>> {
    lua.create_table_from(header.iter().map(|(k, v)| (k.as_str(), v.as_str())))
}

/// Read a Lua table back as a JSON object.
///
/// Integer keys are rendered in decimal. A nested table whose keys are
/// exactly `1..=n` becomes an array, any other table an object. Values
/// without a JSON form (functions, userdata, non-finite floats) are dropped.
pub fn from_lua_table(table: Table) -> Result<Map<String, Value>> {
    table_to_map(table, 0)
}

/// Read a Lua table back as headers.
///
/// Strings, numbers and booleans are rendered as strings, anything else is
/// dropped.
pub fn header_from_lua_table(table: Table) -> Result<Header> {
    let mut header = Header::new();
    for pair in table.pairs::<LuaValue, LuaValue>() {
        let (k, v) = pair?;
        if let (Some(k), Some(v)) = (key_to_string(&k), scalar_to_string(&v)) {
            header.insert(k, v);
        }
    }
    Ok(header)
}

fn table_to_map(table: Table, depth: usize) -> Result<Map<String, Value>> {
    let mut map = Map::new();
    for pair in table.pairs::<LuaValue, LuaValue>() {
        let (k, v) = pair?;
        let Some(k) = key_to_string(&k) else {
            continue;
        };
        if let Some(v) = from_lua_value(v, depth + 1)? {
            map.insert(k, v);
        }
    }
    Ok(map)
}

fn from_lua_value(value: LuaValue, depth: usize) -> Result<Option<Value>> {
    let v = match value {
        LuaValue::Boolean(b) => Value::Bool(b),
        LuaValue::Integer(i) => Value::from(i),
        LuaValue::Number(n) => match Number::from_f64(n) {
            Some(n) => Value::Number(n),
            None => return Ok(None),
        },
        LuaValue::String(s) => Value::String(s.to_string_lossy().into_owned()),
        LuaValue::Table(t) => {
            if depth > MAX_TABLE_DEPTH {
                bail!("table nesting exceeds {MAX_TABLE_DEPTH} levels");
            }
            table_to_value(t, depth)?
        }
        _ => return Ok(None),
    };
    Ok(Some(v))
}

fn table_to_value(table: Table, depth: usize) -> Result<Value> {
    let mut entries = Vec::new();
    for pair in table.pairs::<LuaValue, LuaValue>() {
        entries.push(pair?);
    }

    let n = entries.len();
    let is_array = n > 0
        && entries
            .iter()
            .all(|(k, _)| matches!(k, LuaValue::Integer(i) if *i >= 1 && (*i as usize) <= n));
    if !is_array {
        let mut map = Map::new();
        for (k, v) in entries {
            let Some(k) = key_to_string(&k) else {
                continue;
            };
            if let Some(v) = from_lua_value(v, depth + 1)? {
                map.insert(k, v);
            }
        }
        return Ok(Value::Object(map));
    }

    let mut items = vec![Value::Null; n];
    for (k, v) in entries {
        if let LuaValue::Integer(i) = k {
            items[i as usize - 1] = from_lua_value(v, depth + 1)?.unwrap_or(Value::Null);
        }
    }
    Ok(Value::Array(items))
}

fn key_to_string(key: &LuaValue) -> Option<String> {
    match key {
        LuaValue::String(s) => Some(s.to_string_lossy().into_owned()),
        LuaValue::Integer(i) => Some(i.to_string()),
        LuaValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn scalar_to_string(value: &LuaValue) -> Option<String> {
    match value {
        LuaValue::String(s) => Some(s.to_string_lossy().into_owned()),
        LuaValue::Integer(i) => Some(i.to_string()),
        LuaValue::Number(n) => Some(n.to_string()),
        LuaValue::Boolean(b) => Some(b.to_string()),
        _ => None,
    }
}

// Text dump of the typed symbol graph
//
// Renders a module's types, functions, lowered bodies, and generic
// instance cache in a stable, human-readable form. Used by the CLI's
// `dump` command and by tests asserting on the lowered shape.

use super::mangle::Mangler;
use super::symbol::{FuncId, GenericRef, MemberId, ModuleId, SymbolTable, TypeId};
use super::value::{Statement, Value};

/// Render a module and everything it owns
pub fn dump_module(symbols: &SymbolTable, module: ModuleId) -> String {
    let mut out = String::new();
    let data = symbols.module(module);
    out.push_str(&format!("module {}\n", data.name));

    for &member in &data.members {
        match member {
            MemberId::Type(ty) => dump_type(symbols, ty, &mut out),
            MemberId::Function(func) => dump_function(symbols, func, 0, &mut out),
            MemberId::Field(field) => {
                let field = symbols.field(field);
                out.push_str(&format!(
                    "  field {}: {}\n",
                    field.name,
                    symbols.type_display(field.ty)
                ));
            }
        }
    }

    if !data.instances.is_empty() {
        out.push_str("  instances:\n");
        for ((definition, arguments), instance) in &data.instances {
            let name = match definition {
                GenericRef::Type(ty) => symbols.ty(*ty).name.clone(),
                GenericRef::Function(func) => symbols.function(*func).name.clone(),
            };
            let args = arguments
                .iter()
                .map(|&a| symbols.type_display(a))
                .collect::<Vec<_>>()
                .join(", ");
            let target = match instance {
                GenericRef::Type(ty) => symbols.type_display(*ty),
                GenericRef::Function(func) => signature(symbols, *func),
            };
            out.push_str(&format!("    {}[{}] -> {}\n", name, args, target));
        }
    }

    out
}

fn dump_type(symbols: &SymbolTable, ty: TypeId, out: &mut String) {
    let data = symbols.ty(ty);
    let keyword = match data.kind {
        super::types::TypeKind::Class | super::types::TypeKind::Str => "class",
        _ => "struct",
    };
    let mut mangler = Mangler::new(symbols);
    out.push_str(&format!(
        "  {} {}  [{}]\n",
        keyword,
        symbols.type_display(ty),
        mangler.mangle_type(ty)
    ));

    for &member in &data.members {
        match member {
            MemberId::Field(field) => {
                let field = symbols.field(field);
                out.push_str(&format!(
                    "    field {}: {}\n",
                    field.name,
                    symbols.type_display(field.ty)
                ));
            }
            MemberId::Function(func) => dump_function(symbols, func, 2, out),
            MemberId::Type(nested) => dump_type(symbols, nested, out),
        }
    }
}

fn signature(symbols: &SymbolTable, func: FuncId) -> String {
    let data = symbols.function(func);
    let params = data
        .parameters
        .iter()
        .map(|&p| {
            let param = symbols.parameter(p);
            format!("{}: {}", param.name, symbols.type_display(param.ty))
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "{}({}) -> {}",
        data.name,
        params,
        symbols.type_display(symbols.return_type(func))
    )
}

fn dump_function(symbols: &SymbolTable, func: FuncId, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth + 1);
    let mut mangler = Mangler::new(symbols);
    out.push_str(&format!(
        "{}def {}  [{}]\n",
        indent,
        signature(symbols, func),
        mangler.mangle_function(func)
    ));
    if let Some(body) = &symbols.function(func).body {
        dump_statement(symbols, body, depth + 2, out);
    }
}

fn dump_statement(symbols: &SymbolTable, statement: &Statement, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    match statement {
        Statement::Block { statements, .. } => {
            for statement in statements {
                dump_statement(symbols, statement, depth, out);
            }
        }
        Statement::Pass { .. } => out.push_str(&format!("{}pass\n", indent)),
        Statement::Return { value, .. } => match value {
            Some(value) => out.push_str(&format!(
                "{}return {}\n",
                indent,
                dump_value(symbols, value)
            )),
            None => out.push_str(&format!("{}return\n", indent)),
        },
        Statement::Expression { value } => {
            out.push_str(&format!("{}{}\n", indent, dump_value(symbols, value)))
        }
        Statement::Condition {
            condition,
            then_statement,
            else_statement,
            ..
        } => {
            out.push_str(&format!("{}if {}:\n", indent, dump_value(symbols, condition)));
            dump_statement(symbols, then_statement, depth + 1, out);
            if let Some(else_statement) = else_statement {
                out.push_str(&format!("{}else:\n", indent));
                dump_statement(symbols, else_statement, depth + 1, out);
            }
        }
        Statement::While {
            condition,
            then_statement,
            else_statement,
            ..
        } => {
            out.push_str(&format!(
                "{}while {}:\n",
                indent,
                dump_value(symbols, condition)
            ));
            dump_statement(symbols, then_statement, depth + 1, out);
            if let Some(else_statement) = else_statement {
                out.push_str(&format!("{}else:\n", indent));
                dump_statement(symbols, else_statement, depth + 1, out);
            }
        }
        Statement::Assign { target, source, .. } => out.push_str(&format!(
            "{}{} = {}\n",
            indent,
            dump_value(symbols, target),
            dump_value(symbols, source)
        )),
    }
}

fn dump_value(symbols: &SymbolTable, value: &Value) -> String {
    match value {
        Value::Integer { value, .. } => value.to_string(),
        Value::Boolean { value, .. } => if *value { "True" } else { "False" }.to_string(),
        Value::Str { value, .. } => format!("{:?}", value),
        Value::Call {
            function,
            arguments,
            ..
        } => {
            let args = arguments
                .iter()
                .map(|a| dump_value(symbols, a))
                .collect::<Vec<_>>()
                .join(", ");
            format!("{}({})", symbols.function(*function).name, args)
        }
        Value::New { ty, arguments, .. } => {
            let args = arguments
                .iter()
                .map(|a| dump_value(symbols, a))
                .collect::<Vec<_>>()
                .join(", ");
            format!("new {}({})", symbols.type_display(*ty), args)
        }
        Value::BoundedField {
            instance, field, ..
        } => format!(
            "{}.{}",
            dump_value(symbols, instance),
            symbols.field(*field).name
        ),
        Value::Parameter { parameter, .. } => symbols.parameter(*parameter).name.clone(),
        Value::Variable { variable, .. } => symbols.variable(*variable).name.clone(),
        Value::Error { .. } => "<error>".to_string(),
    }
}

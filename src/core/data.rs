use serde_json::Value;

/// Valor de celda clasificado a partir del contenido JSON
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    /// Monto monetario detectado por prefijo `$`
    Currency(f64),
    /// Porcentaje detectado por sufijo `%`, almacenado como fracción
    Percent(f64),
    Bool(bool),
}

impl CellValue {
    pub fn classify(value: &Value) -> Self {
        match value {
            Value::Null => CellValue::Empty,
            Value::Bool(b) => CellValue::Bool(*b),
            Value::Number(n) => CellValue::Number(n.as_f64().unwrap_or(0.0)),
            Value::String(s) => Self::classify_str(s),
            other => CellValue::Text(other.to_string()),
        }
    }

    pub fn classify_str(raw: &str) -> Self {
        let text = raw.trim();
        if text.is_empty() {
            return CellValue::Empty;
        }

        let (negative, unsigned) = split_sign(text);

        if let Some(amount) = unsigned.strip_prefix('$') {
            let (inner_negative, amount) = split_sign(amount.trim());
            if let Some(n) = parse_plain_number(amount) {
                let sign = if negative ^ inner_negative { -1.0 } else { 1.0 };
                return CellValue::Currency(sign * n);
            }
        }

        if let Some(number) = unsigned.strip_suffix('%') {
            if let Some(n) = parse_plain_number(number.trim()) {
                let sign = if negative { -1.0 } else { 1.0 };
                return CellValue::Percent(sign * n / 100.0);
            }
        }

        CellValue::Text(raw.to_string())
    }

    /// Valor numérico para sumas; los textos numéricos simples también cuentan
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) | CellValue::Currency(n) | CellValue::Percent(n) => Some(*n),
            CellValue::Text(s) => {
                let (negative, unsigned) = split_sign(s.trim());
                parse_plain_number(unsigned).map(|n| if negative { -n } else { n })
            }
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.as_number().is_some()
    }

    /// Texto legible para formatos de documento
    pub fn display(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Currency(n) => format_money(*n),
            CellValue::Percent(n) => format!("{}%", format_number(n * 100.0)),
            CellValue::Bool(b) => b.to_string(),
        }
    }
}

/// Acepta `-x`, `(x)` y `x`
fn split_sign(text: &str) -> (bool, &str) {
    if let Some(rest) = text.strip_prefix('-') {
        return (true, rest.trim_start());
    }
    if let Some(rest) = text.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
        return (true, rest.trim());
    }
    (false, text)
}

fn parse_plain_number(text: &str) -> Option<f64> {
    if text.is_empty() {
        return None;
    }
    if !text
        .chars()
        .all(|c| c.is_ascii_digit() || c == ',' || c == '.')
    {
        return None;
    }
    if !text.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    text.replace(',', "").parse::<f64>().ok()
}

/// Formatea un número con separadores de miles, sin decimales innecesarios
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        group_thousands(&format!("{:.0}", value))
    } else {
        let formatted = format!("{:.2}", value);
        let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
        group_thousands(trimmed)
    }
}

/// Formatea un monto como moneda con dos decimales
pub fn format_money(amount: f64) -> String {
    let formatted = format!("{:.2}", amount.abs());
    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{}${}", sign, group_thousands(&formatted))
}

fn group_thousands(number: &str) -> String {
    let (sign, digits) = match number.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", number),
    };
    let (integer, decimal) = match digits.split_once('.') {
        Some((i, d)) => (i, Some(d)),
        None => (digits, None),
    };

    let mut grouped = String::new();
    for (i, c) in integer.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let integer: String = grouped.chars().rev().collect();

    match decimal {
        Some(d) => format!("{}{}.{}", sign, integer, d),
        None => format!("{}{}", sign, integer),
    }
}

/// Convierte cualquier valor JSON en texto plano
pub fn text_of(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => items
            .iter()
            .map(text_of)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| format!("{}: {}", k, text_of(v)))
            .collect::<Vec<_>>()
            .join("; "),
    }
}

/// Campo de texto de un objeto, probando varias claves alternativas
pub fn field(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| value.get(*k))
        .map(text_of)
        .find(|s| !s.trim().is_empty())
}

/// Divide un cuerpo de texto en párrafos
pub fn paragraphs(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => s
            .split("\n\n")
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect(),
        Value::Array(items) => items.iter().flat_map(paragraphs).collect(),
        Value::Null => Vec::new(),
        other => {
            let text = text_of(other);
            if text.is_empty() {
                Vec::new()
            } else {
                vec![text]
            }
        }
    }
}

/// Lista de cadenas a partir de un arreglo o un texto multilínea
pub fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(text_of)
            .filter(|s| !s.is_empty())
            .collect(),
        Value::String(s) => s
            .lines()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect(),
        Value::Null => Vec::new(),
        other => vec![text_of(other)],
    }
}

/// Aplana un valor JSON en pares `ruta = valor` sin perder información
pub fn flatten(value: &Value) -> Vec<(String, String)> {
    flatten_values(value)
        .into_iter()
        .map(|(path, leaf)| (path, leaf_text(leaf)))
        .collect()
}

/// Igual que [`flatten`] pero conserva la hoja JSON original
pub fn flatten_values(value: &Value) -> Vec<(String, &Value)> {
    let mut rows = Vec::new();
    flatten_into(String::new(), value, &mut rows);
    rows
}

/// Texto de una hoja aplanada; `null` y los contenedores vacíos se escriben literalmente
pub fn leaf_text(leaf: &Value) -> String {
    match leaf {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Object(_) => "{}".to_string(),
        Value::Array(_) => "[]".to_string(),
        other => other.to_string(),
    }
}

fn flatten_into<'v>(prefix: String, value: &'v Value, rows: &mut Vec<(String, &'v Value)>) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten_into(path, child, rows);
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for (idx, child) in items.iter().enumerate() {
                flatten_into(format!("{}[{}]", prefix, idx), child, rows);
            }
        }
        leaf => rows.push((prefix, leaf)),
    }
}

/// Nombre de archivo seguro para rutas de almacenamiento
pub fn sanitize_filename(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_dash = false;
    for c in raw.trim().chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            out.push(c);
            last_dash = false;
        } else if !last_dash && !out.is_empty() {
            out.push('-');
            last_dash = true;
        }
    }
    let mut out: String = out.trim_end_matches('-').chars().take(80).collect();
    while out.ends_with('-') {
        out.pop();
    }
    if out.is_empty() {
        "document".to_string()
    } else {
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn currency_strings_become_numbers() {
        assert_eq!(CellValue::classify(&json!("$1,234.56")), CellValue::Currency(1234.56));
        assert_eq!(CellValue::classify(&json!("-$5")), CellValue::Currency(-5.0));
        assert_eq!(CellValue::classify(&json!("$-5")), CellValue::Currency(-5.0));
        assert_eq!(CellValue::classify(&json!("($1,000)")), CellValue::Currency(-1000.0));
    }

    #[test]
    fn percent_strings_become_fractions() {
        assert_eq!(CellValue::classify(&json!("42%")), CellValue::Percent(0.42));
        assert_eq!(CellValue::classify(&json!("-10%")), CellValue::Percent(-0.1));
    }

    #[test]
    fn unrelated_text_stays_text() {
        assert_eq!(
            CellValue::classify(&json!("TBD")),
            CellValue::Text("TBD".to_string())
        );
        assert_eq!(
            CellValue::classify(&json!("$abc")),
            CellValue::Text("$abc".to_string())
        );
        assert!(!CellValue::classify(&json!("n/a")).is_numeric());
        assert_eq!(CellValue::classify(&json!("1,200")).as_number(), Some(1200.0));
    }

    #[test]
    fn money_display_groups_thousands() {
        assert_eq!(format_money(1234567.5), "$1,234,567.50");
        assert_eq!(format_money(-12.0), "-$12.00");
        assert_eq!(CellValue::Percent(0.425).display(), "42.5%");
    }

    #[test]
    fn flatten_is_lossless() {
        let rows = flatten(&json!({
            "header": {"to": "Board", "cc": []},
            "items": [1, {"a": null}],
        }));
        assert_eq!(
            rows,
            vec![
                ("header.to".to_string(), "Board".to_string()),
                ("header.cc".to_string(), "[]".to_string()),
                ("items[0]".to_string(), "1".to_string()),
                ("items[1].a".to_string(), "null".to_string()),
            ]
        );
    }

    #[test]
    fn sanitize_filename_strips_unsafe_characters() {
        assert_eq!(sanitize_filename("Q3 Board Report / Final!"), "Q3-Board-Report-Final");
        assert_eq!(sanitize_filename("../../etc/passwd"), "etc-passwd");
        assert_eq!(sanitize_filename("***"), "document");
    }

    #[test]
    fn paragraphs_split_on_blank_lines() {
        let paras = paragraphs(&json!("First.\n\nSecond."));
        assert_eq!(paras, vec!["First.", "Second."]);
    }
}

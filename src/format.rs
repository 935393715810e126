//! numpy compatible text rendering of `NdArray`.
//!
//! `Display` gives what `print(arr)` shows, `NdArray::repr` gives what
//! `repr(arr)` shows. Only the default print options are modelled: maximum
//! precision 8 with trailing zeros trimmed, 75 columns, summarisation past
//! 1000 elements.

use crate::array::{Element, NdArray};
use crate::constants::{EDGE_ITEMS, FLOAT_PRECISION, LINE_WIDTH, SUMMARY_THRESHOLD};
use std::cmp::max;
use std::fmt;

const SUMMARY_INSERT: &str = "...";

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PrintOptions {
    pub line_width: usize,
    pub precision: usize,
    pub threshold: usize,
    pub edge_items: usize,
}

impl Default for PrintOptions {
    fn default() -> Self {
        PrintOptions {
            line_width: LINE_WIDTH,
            precision: FLOAT_PRECISION,
            threshold: SUMMARY_THRESHOLD,
            edge_items: EDGE_ITEMS,
        }
    }
}

/// Layout shared by every element so that columns line up.
#[derive(Clone, Debug, PartialEq)]
enum ElementFormat {
    Int { width: usize },
    Positional { pad_left: usize, pad_right: usize },
    Scientific { pad_left: usize, pad_right: usize, precision: usize, exp_size: usize },
}

fn split_once_char(s: &str, c: char) -> (&str, &str) {
    match s.find(c) {
        Some(idx) => (&s[..idx], &s[idx + 1..]),
        None => (s, ""),
    }
}

fn trim_fraction(s: String) -> String {
    if !s.contains('.') {
        return s;
    }
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Shortest round-trip digits, limited to `precision` fraction digits.
fn positional_digits<T: Element>(value: T, precision: usize) -> String {
    let shortest = format!("{}", value);
    let (_, frac) = split_once_char(&shortest, '.');
    if frac.len() > precision {
        trim_fraction(format!("{:.*}", precision, value))
    } else {
        shortest
    }
}

/// Mantissa digits and exponent of the shortest scientific form.
fn scientific_digits<T: Element>(value: T, precision: usize) -> (String, i32) {
    let mut repr = format!("{:e}", value);
    {
        let (mantissa, _) = split_once_char(&repr, 'e');
        let (_, frac) = split_once_char(mantissa, '.');
        if frac.len() > precision {
            repr = format!("{:.*e}", precision, value);
        }
    }

    let (mantissa, exponent) = split_once_char(&repr, 'e');
    let mantissa = trim_fraction(mantissa.to_string());
    (mantissa, exponent.parse().unwrap_or(0))
}

fn non_finite(value: f64) -> &'static str {
    if value.is_nan() {
        "nan"
    } else if value < 0.0 {
        "-inf"
    } else {
        "inf"
    }
}

impl ElementFormat {
    fn fit<T: Element>(values: &[T], precision: usize) -> Self {
        if !T::IS_FLOAT {
            let width = values.iter().map(|v| v.to_string().len()).max().unwrap_or(0);
            return ElementFormat::Int { width };
        }

        let finite: Vec<T> = values.iter().cloned().filter(|v| v.to_f64().is_finite()).collect();
        let abs_non_zero: Vec<f64> = finite
            .iter()
            .map(|v| v.to_f64().abs())
            .filter(|&v| v != 0.0)
            .collect();

        let use_exp = if abs_non_zero.is_empty() {
            false
        } else {
            let max_val = abs_non_zero.iter().cloned().fold(f64::MIN, f64::max);
            let min_val = abs_non_zero.iter().cloned().fold(f64::MAX, f64::min);
            max_val >= 1e8 || min_val < 1e-4 || max_val / min_val > 1e3
        };

        let format = if finite.is_empty() {
            ElementFormat::Positional { pad_left: 0, pad_right: 0 }
        } else if use_exp {
            let mut pad_left = 0;
            let mut frac_len = 0;
            let mut exp_len = 0;
            for &v in &finite {
                let (mantissa, exponent) = scientific_digits(v, precision);
                let (int_part, frac_part) = split_once_char(&mantissa, '.');
                pad_left = max(pad_left, int_part.len());
                frac_len = max(frac_len, frac_part.len());
                exp_len = max(exp_len, exponent.abs().to_string().len());
            }
            let exp_size = max(exp_len, 2);
            ElementFormat::Scientific {
                pad_left,
                pad_right: exp_size + 2 + frac_len,
                precision: frac_len,
                exp_size,
            }
        } else {
            let mut pad_left = 0;
            let mut pad_right = 0;
            for &v in &finite {
                let digits = positional_digits(v, precision);
                let (int_part, frac_part) = split_once_char(&digits, '.');
                pad_left = max(pad_left, int_part.len());
                pad_right = max(pad_right, frac_part.len());
            }
            ElementFormat::Positional { pad_left, pad_right }
        };

        // nan and inf may be wider than the finite values
        if finite.len() != values.len() {
            let widest = values
                .iter()
                .map(|v| v.to_f64())
                .filter(|v| !v.is_finite())
                .map(|v| non_finite(v).len())
                .max()
                .unwrap_or(0);
            return match format {
                ElementFormat::Positional { pad_left, pad_right } => ElementFormat::Positional {
                    pad_left: max(pad_left, widest.saturating_sub(pad_right + 1)),
                    pad_right,
                },
                ElementFormat::Scientific { pad_left, pad_right, precision, exp_size } => ElementFormat::Scientific {
                    pad_left: max(pad_left, widest.saturating_sub(pad_right + 1)),
                    pad_right,
                    precision,
                    exp_size,
                },
                other => other,
            };
        }

        format
    }

    fn format<T: Element>(&self, value: T, precision: usize) -> String {
        match *self {
            ElementFormat::Int { width } => format!("{:>width$}", value, width = width),
            ElementFormat::Positional { pad_left, pad_right } => {
                let v = value.to_f64();
                if !v.is_finite() {
                    return format!("{:>width$}", non_finite(v), width = pad_left + pad_right + 1);
                }
                let digits = positional_digits(value, precision);
                let (int_part, frac_part) = split_once_char(&digits, '.');
                format!(
                    "{:>pl$}.{:<pr$}",
                    int_part,
                    frac_part,
                    pl = pad_left,
                    pr = pad_right,
                )
            }
            ElementFormat::Scientific { pad_left, pad_right, precision: frac_len, exp_size } => {
                let v = value.to_f64();
                if !v.is_finite() {
                    return format!("{:>width$}", non_finite(v), width = pad_left + pad_right + 1);
                }
                let (mantissa, exponent) = scientific_digits(value, precision);
                let (int_part, frac_part) = split_once_char(&mantissa, '.');
                format!(
                    "{:>pl$}.{:0<fl$}e{}{:0>es$}",
                    int_part,
                    frac_part,
                    if exponent < 0 { '-' } else { '+' },
                    exponent.abs(),
                    pl = pad_left,
                    fl = frac_len,
                    es = exp_size,
                )
            }
        }
    }
}

/// Wraps `line` onto `s` when `word` would overflow it.
fn extend_line(s: &mut String, line: &mut String, word: &str, width: usize, next_line_prefix: &str) {
    let needs_wrap = line.len() + word.len() > width && line.len() > next_line_prefix.len();
    if needs_wrap {
        s.push_str(line.trim_end());
        s.push('\n');
        *line = next_line_prefix.to_string();
    }
    line.push_str(word);
}

struct Layout<'a, T> {
    array: &'a NdArray<T>,
    format: ElementFormat,
    options: &'a PrintOptions,
    separator: &'a str,
    summarize: bool,
}

impl<'a, T: Element> Layout<'a, T> {
    /// Indices along `axis`, `None` standing for the summary marker.
    fn items(&self, axis: usize) -> Vec<Option<usize>> {
        let len = self.array.shape()[axis];
        let edge = self.options.edge_items;
        if self.summarize && 2 * edge < len {
            (0..edge)
                .map(Some)
                .chain(Some(None))
                .chain((len - edge..len).map(Some))
                .collect()
        } else {
            (0..len).map(Some).collect()
        }
    }

    fn shown_values(&self, index: &mut Vec<usize>, out: &mut Vec<T>) {
        if index.len() == self.array.ndim() {
            if let Some(&value) = self.array.get(index) {
                out.push(value);
            }
            return;
        }
        for item in self.items(index.len()) {
            if let Some(idx) = item {
                index.push(idx);
                self.shown_values(index, out);
                index.pop();
            }
        }
    }

    fn render(&self, index: &mut Vec<usize>, hanging_indent: &str, width: usize) -> String {
        let axis = index.len();
        let axes_left = self.array.ndim() - axis;
        if axes_left == 0 {
            let value = self.array.get(index).cloned().unwrap_or_default();
            return self.format.format(value, self.options.precision);
        }

        let next_hanging_indent = format!("{} ", hanging_indent);
        let next_width = width.saturating_sub(1);
        let items = self.items(axis);
        let last = items.len().saturating_sub(1);
        let mut s = String::new();

        if axes_left == 1 {
            let elem_width = width.saturating_sub(max(self.separator.trim_end().len(), 1));
            let mut line = hanging_indent.to_string();
            for (pos, item) in items.into_iter().enumerate() {
                let word = match item {
                    Some(idx) => {
                        index.push(idx);
                        let word = self.render(index, &next_hanging_indent, next_width);
                        index.pop();
                        word
                    }
                    None => SUMMARY_INSERT.to_string(),
                };
                extend_line(&mut s, &mut line, &word, elem_width, hanging_indent);
                if pos != last {
                    line.push_str(self.separator);
                }
            }
            s.push_str(&line);
        } else {
            let line_sep = format!("{}{}", self.separator.trim_end(), "\n".repeat(axes_left - 1));
            for (pos, item) in items.into_iter().enumerate() {
                s.push_str(hanging_indent);
                match item {
                    Some(idx) => {
                        index.push(idx);
                        s.push_str(&self.render(index, &next_hanging_indent, next_width));
                        index.pop();
                    }
                    None => s.push_str(SUMMARY_INSERT),
                }
                if pos != last {
                    s.push_str(&line_sep);
                }
            }
        }

        format!("[{}]", &s[hanging_indent.len()..])
    }
}

/// Equivalent of `numpy.array2string`.
pub fn array_to_string<T: Element>(
    array: &NdArray<T>,
    options: &PrintOptions,
    separator: &str,
    prefix: &str,
    suffix: &str,
) -> String {
    if array.is_empty() {
        return "[]".to_string();
    }

    let mut layout = Layout {
        array,
        format: ElementFormat::Int { width: 0 },
        options,
        separator,
        summarize: array.len() > options.threshold,
    };

    let mut shown = Vec::new();
    layout.shown_values(&mut Vec::new(), &mut shown);
    layout.format = ElementFormat::fit(&shown, options.precision);

    let next_line_prefix = " ".repeat(1 + prefix.len());
    let width = options.line_width.saturating_sub(suffix.len());
    layout.render(&mut Vec::new(), &next_line_prefix, width)
}

impl<T: Element> NdArray<T> {
    /// What numpy's `repr` prints, e.g. `array([[1., 2., 3.]])`.
    pub fn repr(&self) -> String {
        self.repr_with(&PrintOptions::default())
    }

    pub fn repr_with(&self, options: &PrintOptions) -> String {
        let prefix = "array(";
        let skip_dtype = T::DTYPE == "float64" && !self.is_empty();
        let suffix = if skip_dtype { ")" } else { "," };

        let body = if !self.is_empty() || self.shape() == [0] {
            array_to_string(self, options, ", ", prefix, suffix)
        } else {
            let dims: Vec<String> = self.shape().iter().map(|d| d.to_string()).collect();
            format!("[], shape=({})", dims.join(", "))
        };

        let arr_str = format!("{}{}{}", prefix, body, suffix);
        if skip_dtype {
            return arr_str;
        }

        let dtype_str = format!("dtype={})", T::DTYPE);
        let last_line_len = arr_str.len() - arr_str.rfind('\n').map(|idx| idx + 1).unwrap_or(0);
        let spacer = if last_line_len + dtype_str.len() + 1 > options.line_width {
            format!("\n{}", " ".repeat(prefix.len()))
        } else {
            " ".to_string()
        };

        format!("{}{}{}", arr_str, spacer, dtype_str)
    }
}

impl<T: Element> fmt::Display for NdArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&array_to_string(self, &PrintOptions::default(), " ", "", ""))
    }
}

//! Go `text/template` rendering over JSON, XML and YAML data.
//!
//! Data of unknown format goes through [detect_and_parse], which sniffs the
//! first character and yields a canonical [Value] mapping. A template is then
//! compiled against a function [Library] and rendered with [render], or a
//! [Renderer] bound to an explicit library.
//!
//! The library carries the Go built-ins, a sprig style utility pack, the
//! `toUTCDateTime` / `toLocalDateTime` normalizers and lenient converters
//! (`toYaml`, `fromYaml`, `toToml`, ...). Nothing in it reaches the host
//! environment.
//!
//! Missing mapping keys are errors, as with Go's `missingkey=error`; use
//! `index` or `default` for optional data.
//!
//!
//! # Samples
//!
//! ## Hello world
//!
//! ```
//! use gotmpl::{detect_and_parse, render_to_string};
//!
//! let data = detect_and_parse(r#"{"you": "world"}"#).unwrap();
//! let result = render_to_string("hello, {{ .you }}!", &data).unwrap();
//!
//! assert_eq!(result, "hello, world!")
//! ```
//!
//! ## Hello team
//!
//! ```
//! use gotmpl::{detect_and_parse, render_to_string};
//! let text = r#"
//! {{- range .team }}
//! hello, {{ .address }} {{ .name | upper }}!
//! {{- end }}
//! "#;
//! let data = r#"
//!   team:
//!     - name: john
//!       address: little
//!     - name: 42
//!       address: citizen
//! "#;
//!
//! let data = detect_and_parse(data).unwrap();
//! let result = render_to_string(text, &data);
//! assert!(result.is_err());
//!
//! let text = text.replace(".name | upper", "toString .name | upper");
//! let result = render_to_string(&text, &data).unwrap();
//! assert_eq!(result, "\nhello, little JOHN!\nhello, citizen 42!\n");
//! ```
//!
//! ## Explicit configuration
//!
//! ```
//! use gotmpl::{Config, Library, Renderer, detect_and_parse};
//!
//! let library = Library::new(&Config::default().with_timezone("UTC")).unwrap();
//! let data = detect_and_parse("<event><at>2024-01-15 10:30:00</at></event>").unwrap();
//!
//! let mut out = Vec::new();
//! Renderer::new(&library)
//!     .render("{{ toLocalDateTime .event.at }}", &data, &mut out)
//!     .unwrap();
//! assert_eq!(out, b"2024-01-15T10:30:00.000Z");
//! ```
mod config;
mod context;
mod detect;
mod error;
mod funcs;
mod lexer;
mod parser;
mod pipeline;
mod printf;
mod reader;
mod render;
mod template;
mod value;
mod xml;

pub use self::config::{Config, DEFAULT_TIMEZONE, TIMEZONE_VAR};
pub use self::detect::{detect_and_parse, DataFormat};
pub use self::error::{ConfigError, Error, ErrorKind, FuncError};
pub use self::funcs::{Func, Library};
pub use self::render::{render, render_to_string, Renderer, TEMPLATE_NAME};
pub use self::template::Template;
pub use self::value::{Mapping, Value, ValueExt, YamlValue};

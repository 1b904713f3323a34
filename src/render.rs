//! The render entry points.
//!
//! A render compiles the template against a [`Library`], executes it against
//! the data and writes the output to the sink only once execution completed.
//! Faults from anywhere below, panics included, surface as an [`Error`].
use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use log::debug;
use crate::error::Error;
use crate::funcs::Library;
use crate::template::Template;
use crate::value::Value;


/// Name templates are compiled under; it shows up in diagnostics.
pub const TEMPLATE_NAME: &str = "gotmpl";


/// Renders templates with an explicit function library.
#[derive(Debug, Clone, Copy)]
pub struct Renderer<'a> {
    library: &'a Library
}

impl<'a> Renderer<'a> {
    pub fn new(library: &'a Library) -> Self {
        Renderer {
            library
        }
    }

    /// Renders `template` against `data` into `sink`. Nothing is written
    /// unless the whole template executed.
    pub fn render<W: io::Write + ?Sized>(
        &self, template: &str, data: &Value, sink: &mut W
    ) -> Result<(), Error> {
        let output = self.render_to_string(template, data)?;
        sink.write_all(output.as_bytes())
            .and_then(|_| sink.flush())
            .map_err(|err| Error::TemplateExecution(format!("write error: {}", err)))
    }

    pub fn render_to_string(&self, template: &str, data: &Value) -> Result<String, Error> {
        let library = self.library;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let compiled = Template::parse(TEMPLATE_NAME, template, library)?;
            debug!("compiled template ({} bytes)", template.len());
            compiled.execute(data, library)
        }));
        match outcome {
            Ok(result) => {
                if let Ok(output) = &result {
                    debug!("rendered {} bytes", output.len());
                }
                result
            },
            Err(payload) => Err(Error::TemplateExecution(
                format!("template: {}: panic: {}", TEMPLATE_NAME, panic_message(payload.as_ref()))
            ))
        }
    }
}


fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown cause"
    }
}


/// Renders with the process-wide [`Library::global`].
pub fn render<W: io::Write + ?Sized>(template: &str, data: &Value, sink: &mut W) -> Result<(), Error> {
    Renderer::new(Library::global()).render(template, data, sink)
}

/// Renders with the process-wide [`Library::global`] into a string.
pub fn render_to_string(template: &str, data: &Value) -> Result<String, Error> {
    Renderer::new(Library::global()).render_to_string(template, data)
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use crate::config::Config;
    use crate::error::{ErrorKind, FuncError};

    struct BrokenSink;

    impl io::Write for BrokenSink {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn library() -> Library {
        Library::new(&Config::default()).unwrap()
    }

    #[test]
    fn renders_into_sink() {
        let library = library();
        let mut sink = Vec::new();
        Renderer::new(&library)
            .render("hello {{ .name }}", &json!({"name": "world"}), &mut sink)
            .unwrap();
        assert_eq!(String::from_utf8(sink).unwrap(), "hello world");
    }

    #[test]
    fn nothing_is_written_on_failure() {
        let library = library();
        let mut sink = Vec::new();
        let error = Renderer::new(&library)
            .render("partial {{ .missing }}", &json!({}), &mut sink)
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::TemplateExecution);
        assert!(sink.is_empty());
    }

    #[test]
    fn write_failures_are_execution_errors() {
        let library = library();
        let error = Renderer::new(&library)
            .render("text", &json!({}), &mut BrokenSink)
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::TemplateExecution);
        assert!(error.message().starts_with("write error:"));
    }

    #[test]
    fn compile_errors_name_the_template() {
        let library = library();
        let error = Renderer::new(&library)
            .render_to_string("{{ env \"HOME\" }}", &json!({}))
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::TemplateCompile);
        assert!(error.message().starts_with("template: gotmpl:1:"), "{}", error.message());
    }

    #[test]
    fn panics_are_contained() {
        let library = library().with_function("explode", |_args| -> Result<Value, FuncError> {
            panic!("kaboom")
        });
        let error = Renderer::new(&library)
            .render_to_string("{{ explode }}", &json!({}))
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::TemplateExecution);
        assert!(error.message().contains("kaboom"));
    }

    #[test]
    fn global_library_renders() {
        let output = render_to_string("{{ upper .a }}", &json!({"a": "x"})).unwrap();
        assert_eq!(output, "X");
    }
}

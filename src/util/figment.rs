use error_stack::{Context, Report};

/// Figment errors carry the offending key and the provider it came
/// from, which gets lost if the error is only displayed.
pub trait FigmentErrorAttachable<T: Context> {
    fn attach_figment_error(self, err: figment::Error) -> Report<T>;
}

impl<T: Context> FigmentErrorAttachable<T> for Report<T> {
    fn attach_figment_error(self, error: figment::Error) -> Report<T> {
        // figment chains every failing field into one error
        error.into_iter().fold(self, |report, e| {
            let mut message = e.kind.to_string();
            if let (Some(profile), Some(md)) = (&e.profile, &e.metadata) {
                if !e.path.is_empty() {
                    let key = md.interpolate(profile, &e.path);
                    message.push_str(&format!(" for key {key:?}"));
                }
            }

            if let Some(md) = &e.metadata {
                match &md.source {
                    Some(source) => message.push_str(&format!(" in {source} {}", md.name)),
                    None => message.push_str(&format!(" in {}", md.name)),
                }
            }

            report.attach_printable(message)
        })
    }
}

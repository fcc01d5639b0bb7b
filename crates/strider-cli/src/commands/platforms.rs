use crate::error::Result;
use strider::core::backend::Backend;
use strider::core::backend::reference::ReferenceBackend;
use strider::engine::FASTEST_PLATFORM;
use strider::engine::error::EngineError;

pub fn run() -> Result<()> {
    print!("{}", describe(&ReferenceBackend::default())?);
    Ok(())
}

fn describe<B: Backend>(backend: &B) -> Result<String> {
    let default = backend.default_platform().map_err(EngineError::from)?;
    let mut platforms = backend.available_platforms();
    platforms.sort_by(|a, b| b.speed().total_cmp(&a.speed()));

    let mut lines = vec![format!("{:<12} {:>8}", "platform", "speed")];
    lines.extend(platforms.iter().map(|platform| {
        let marker = if platform.name() == default.name() {
            "  (default)"
        } else {
            ""
        };
        format!("{:<12} {:>8.1}{}", platform.name(), platform.speed(), marker)
    }));
    lines.push(format!(
        "Use '{}' to select the highest-rated platform.",
        FASTEST_PLATFORM
    ));
    Ok(lines.join("\n") + "\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use strider::core::backend::Platform;

    #[test]
    fn platforms_are_listed_fastest_first() {
        let text = describe(&ReferenceBackend::default()).unwrap();
        let lines: Vec<_> = text.lines().collect();

        assert!(lines[1].starts_with("CPU"));
        assert!(lines[1].ends_with("(default)"));
        assert!(lines[2].starts_with("Reference"));
        assert!(text.contains("fastest"));
    }

    #[test]
    fn backend_without_platforms_is_an_error() {
        let backend = ReferenceBackend::with_platforms(Vec::<Platform>::new());
        assert!(describe(&backend).is_err());
    }
}

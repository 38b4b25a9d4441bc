use crate::error::ConvertError;
use crate::sql2es::pipeline::ConvertConfig;
use crate::sql2es::response::split_directive;

fn join_endpoint(base: &str, path: &str) -> String {
    let base = base.trim();
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{base}{}", &path[1..]),
        (false, false) => format!("{base}/{path}"),
        _ => format!("{base}{path}"),
    }
}

// Credentials and body are interpolated as-is, without shell escaping.
pub fn build_curl_command(
    api_path: &str,
    query_dsl: &str,
    config: &ConvertConfig,
) -> Result<String, ConvertError> {
    let (method, path) = split_directive(api_path)
        .ok_or_else(|| ConvertError::MalformedDirective(api_path.to_string()))?;

    let mut command = format!("curl -X {method} -H \"Content-Type: application/json\"");

    let username = config.es_username.as_str();
    let password = config.es_password.as_str();
    if !username.is_empty() && !password.is_empty() {
        command.push_str(&format!(" -u \"{username}:{password}\""));
    }

    command.push_str(&format!(" \"{}\"", join_endpoint(&config.es_endpoint, path)));

    if !query_dsl.is_empty() {
        command.push_str(&format!(" -d '{query_dsl}'"));
    }
    Ok(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(endpoint: &str, username: &str, password: &str) -> ConvertConfig {
        ConvertConfig {
            es_endpoint: endpoint.to_string(),
            es_username: username.to_string(),
            es_password: password.to_string(),
            ..ConvertConfig::default()
        }
    }

    #[test]
    fn omits_credentials_when_username_is_empty() {
        let cmd = build_curl_command("GET /idx/_search", "", &config("localhost:9200", "", "secret"))
            .expect("curl");
        assert_eq!(
            cmd,
            "curl -X GET -H \"Content-Type: application/json\" \"localhost:9200/idx/_search\""
        );
        assert!(!cmd.contains("-u"));
    }

    #[test]
    fn omits_credentials_when_password_is_empty() {
        let cmd = build_curl_command("GET /idx/_search", "", &config("localhost:9200", "elastic", ""))
            .expect("curl");
        assert!(!cmd.contains("-u "));
    }

    #[test]
    fn includes_credentials_and_body_when_present() {
        let cmd = build_curl_command(
            "POST /idx/_search",
            "{\n  \"size\": 1\n}",
            &config("http://es:9200", "elastic", "changeme"),
        )
        .expect("curl");
        assert_eq!(
            cmd,
            "curl -X POST -H \"Content-Type: application/json\" -u \"elastic:changeme\" \"http://es:9200/idx/_search\" -d '{\n  \"size\": 1\n}'"
        );
    }

    #[test]
    fn joins_endpoint_and_path_with_a_single_slash() {
        assert_eq!(join_endpoint("http://es:9200/", "/idx"), "http://es:9200/idx");
        assert_eq!(join_endpoint("http://es:9200", "idx"), "http://es:9200/idx");
        assert_eq!(join_endpoint("http://es:9200", "/idx"), "http://es:9200/idx");
    }

    #[test]
    fn rejects_directive_without_path() {
        let err = build_curl_command("GET", "", &config("localhost:9200", "", ""))
            .expect_err("should fail");
        assert!(matches!(err, ConvertError::MalformedDirective(line) if line == "GET"));
    }
}

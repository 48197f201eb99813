use crate::presign;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SignedUrlCommands {
    pub wget: Option<String>,
    pub curl: Option<String>,
}

pub fn signed_url_commands(
    method: presign::PresignMethod,
    result: &presign::PresignedResult,
    filename: &str,
    content_type: Option<&str>,
    content_disposition: Option<&str>,
) -> SignedUrlCommands {
    match method {
        presign::PresignMethod::Get => SignedUrlCommands {
            wget: Some(format!("wget \"{}\" -O \"{}\"", result.url(), filename)),
            curl: Some(format!("curl -L \"{}\" -o \"{}\"", result.url(), filename)),
        },
        presign::PresignMethod::Put => {
            let mut headers: Vec<(&str, &str)> = Vec::new();
            if let Some(content_type) = content_type {
                headers.push(("Content-Type", content_type));
            }
            if let Some(content_disposition) = content_disposition {
                headers.push(("Content-Disposition", content_disposition));
            }

            let mut wget_parts = vec![format!("wget --method=PUT --body-file=\"{}\"", filename)];
            let mut curl_parts = vec![format!("curl -T \"{}\"", filename)];
            for (name, value) in &headers {
                wget_parts.push(format!("--header=\"{}: {}\"", name, value));
                curl_parts.push(format!("-H \"{}: {}\"", name, value));
            }
            wget_parts.push(format!("\"{}\"", result.url()));
            curl_parts.push(format!("\"{}\"", result.url()));

            SignedUrlCommands {
                wget: Some(wget_parts.join(" ")),
                curl: Some(curl_parts.join(" ")),
            }
        }
        presign::PresignMethod::Post => {
            let mut parts = vec!["curl".to_string(), "-X".to_string(), "POST".to_string()];

            if let presign::PresignedResult::Form(form) = result {
                if let Some(key) = form.fields.get("key") {
                    parts.push(format!("-F \"key={}\"", key));
                }

                let mut rest: Vec<(&String, &String)> = form
                    .fields
                    .iter()
                    .filter(|(name, _)| name.as_str() != "key")
                    .collect();
                rest.sort_by(|a, b| a.0.cmp(b.0));
                for (name, value) in rest {
                    parts.push(format!("-F \"{}={}\"", name, value));
                }
            }

            parts.push("-F \"file=@PATH_TO_FILE\"".to_string());
            parts.push(format!("\"{}\"", result.url()));

            SignedUrlCommands {
                wget: None,
                curl: Some(parts.join(" ")),
            }
        }
    }
}

use url::Url;

pub const ACCOUNT_ID_PLACEHOLDER: &str = "{account_id}";

const INVALID_SCHEME: &str = "scheme must be https:// or http:// .";
const NO_ACCOUNT_ID_PLACEHOLDER: &str = "endpoint url template must contain {account_id} .";

pub fn check_scheme(url: &str) -> Result<String, String> {
    let parsed = Url::parse(url).map_err(|e| e.to_string())?;

    if parsed.scheme() != "https" && parsed.scheme() != "http" {
        return Err(INVALID_SCHEME.to_string());
    }

    Ok(url.to_string())
}

pub fn check_endpoint_url_template(template: &str) -> Result<String, String> {
    if !template.contains(ACCOUNT_ID_PLACEHOLDER) {
        return Err(NO_ACCOUNT_ID_PLACEHOLDER.to_string());
    }

    // a placeholder is not a valid host, so validate with a sample account id.
    check_scheme(&expand_endpoint_url_template(template, "account"))?;

    Ok(template.to_string())
}

pub fn expand_endpoint_url_template(template: &str, account_id: &str) -> String {
    template.replace(ACCOUNT_ID_PLACEHOLDER, account_id)
}

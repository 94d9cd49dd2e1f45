use citadel_fetch::{
    ConsumerId, Credential, CredentialPersistence, HttpTransportFactory, LoadControl, NetworkError, NetworkManager,
    Request, ResourceConsumer, Response,
};
use std::cell::RefCell;
use std::error::Error;
use std::rc::Rc;

/// Prints what arrives and keeps the body
#[derive(Default)]
struct Printer {
    body: Vec<u8>,
}

impl ResourceConsumer for Printer {
    fn will_send_request(&mut self, _ctl: &mut LoadControl, request: &mut Request, prior: &Response) {
        println!("{} -> {} {}", prior.status(), request.method(), request.url());
    }

    fn did_receive_response(&mut self, _ctl: &mut LoadControl, response: &Response) {
        println!("\nResponse Status: {} {}", response.status(), response.status_text());
        println!("Content Type: {:?}", response.mime_type());
        println!("Encoding: {:?}", response.text_encoding());
        println!("Expected Length: {:?}", response.expected_content_length());
    }

    fn did_receive_data(&mut self, _ctl: &mut LoadControl, data: &[u8]) {
        self.body.extend_from_slice(data);
    }

    fn did_finish_loading(&mut self) {
        println!("\nFinished, {} bytes", self.body.len());
    }

    fn did_fail(&mut self, error: &NetworkError) {
        println!("\nFailed: {}", error);
    }

    fn authentication_challenge(&mut self, realm: &str) -> Option<Credential> {
        // Credentials from the environment stand in for a login dialog
        let user = std::env::var("FETCH_USER").ok()?;
        let password = std::env::var("FETCH_PASSWORD").unwrap_or_default();
        println!("Answering challenge for realm \"{}\" as {}", realm, user);
        Some(Credential::new(&user, &password, CredentialPersistence::ForSession))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let url = std::env::args().nth(1).unwrap_or_else(|| "https://example.com".to_string());
    let mut manager = NetworkManager::new();
    let transport = Rc::new(HttpTransportFactory::current()?);
    let printer = Rc::new(RefCell::new(Printer::default()));

    println!("Fetching {}...", url);
    manager.start_job(ConsumerId(1), printer.clone(), Request::new(citadel_fetch::Method::GET, &url)?, transport, false)?;
    manager.run().await;

    let body = String::from_utf8_lossy(&printer.borrow().body).into_owned();
    let preview: String = body.chars().take(500).collect();
    println!("\nContent Preview:");
    println!("{}", preview);

    Ok(())
}

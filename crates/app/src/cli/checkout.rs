use clap::Args;
use storefront_app::{api::models::CheckoutPayload, context::StorefrontContext};

use super::format_amount;

#[derive(Debug, Args)]
pub(crate) struct CheckoutArgs {
    /// Customer name
    #[arg(long)]
    name: String,

    /// Customer phone number
    #[arg(long)]
    phone: String,

    #[arg(long)]
    email: Option<String>,

    /// Free-form note for the order
    #[arg(long)]
    comment: Option<String>,
}

pub(crate) async fn run(context: &StorefrontContext, args: CheckoutArgs) -> Result<(), String> {
    if args.phone.trim().is_empty() {
        return Err("phone cannot be empty".to_string());
    }

    let mut store = context.cart_store();

    store
        .restore()
        .await
        .map_err(|error| error.user_message())?;

    let submitted = store
        .checkout(CheckoutPayload {
            name: args.name,
            phone: args.phone,
            email: args.email,
            comment: args.comment,
        })
        .await
        .map_err(|error| error.user_message())?;

    println!("cart_id: {}", submitted.id);
    println!("total: {}", format_amount(submitted.total_value()));
    if let Some(lead) = submitted.lead {
        println!("lead: {lead}");
    } else {
        println!("checkout submitted; no lead was returned");
    }

    Ok(())
}

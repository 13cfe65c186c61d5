use std::num::NonZeroU32;

use clap::{Args, Subcommand};
use storefront_app::{
    api::models::{NewCartBundle, NewCartItem},
    context::StorefrontContext,
    domain::carts::CartStore,
};

use super::format_amount;

#[derive(Debug, Args)]
pub(crate) struct CartCommand {
    #[command(subcommand)]
    command: CartSubcommand,
}

#[derive(Debug, Subcommand)]
enum CartSubcommand {
    /// Print the remembered cart without changing anything remotely
    Show,
    /// Reload the remembered cart, creating a fresh one if it is unreadable
    Restore,
    Add(AddArgs),
    Bundle(BundleArgs),
    Remove(RemoveArgs),
    /// Re-fetch the cart from the backend
    Refresh,
    /// Forget the cart locally
    Clear,
}

#[derive(Debug, Args)]
struct AddArgs {
    /// Inventory unit to add
    #[arg(long)]
    unit: u64,

    #[arg(long, default_value_t = NonZeroU32::MIN)]
    quantity: NonZeroU32,

    /// Promotion the unit is added under
    #[arg(long)]
    promotion: Option<u64>,

    /// Price override in minor units
    #[arg(long)]
    price: Option<u64>,
}

#[derive(Debug, Args)]
struct BundleArgs {
    #[arg(long)]
    bundle: u64,

    /// Main unit of the bundle
    #[arg(long)]
    main_unit: Option<u64>,

    /// Bundle component; repeat for each one
    #[arg(long = "item")]
    items: Vec<u64>,
}

#[derive(Debug, Args)]
struct RemoveArgs {
    /// Cart line to remove
    #[arg(long)]
    item: u64,
}

pub(crate) async fn run(context: &StorefrontContext, command: CartCommand) -> Result<(), String> {
    let mut store = context.cart_store();

    let result = match command.command {
        CartSubcommand::Clear => store.clear_cart(),
        CartSubcommand::Show => store.load().await,
        CartSubcommand::Restore => store.restore().await,
        CartSubcommand::Refresh => {
            load(&mut store).await?;
            store.update_cart().await
        }
        CartSubcommand::Add(args) => {
            let mut item = NewCartItem::new(args.unit).with_quantity(args.quantity);

            if let Some(promotion) = args.promotion {
                item = item.with_promotion(promotion);
            }

            if let Some(price) = args.price {
                item = item.with_unit_price(price);
            }

            restore_then(&mut store).await?;
            store.add_to_cart(item).await
        }
        CartSubcommand::Bundle(args) => {
            restore_then(&mut store).await?;
            store
                .add_bundle_to_cart(NewCartBundle {
                    bundle_id: args.bundle,
                    main_unit_id: args.main_unit,
                    item_ids: args.items,
                })
                .await
        }
        CartSubcommand::Remove(args) => {
            load(&mut store).await?;
            store.remove_from_cart(args.item).await
        }
    };

    result.map_err(|error| error.user_message())?;

    print_cart(&store);

    Ok(())
}

async fn restore_then(store: &mut CartStore) -> Result<(), String> {
    store.restore().await.map_err(|error| error.user_message())
}

async fn load(store: &mut CartStore) -> Result<(), String> {
    store.load().await.map_err(|error| error.user_message())
}

fn print_cart(store: &CartStore) {
    let Some(cart) = store.cart() else {
        println!("cart is empty");
        return;
    };

    println!("cart_id: {}", cart.id);
    for item in &cart.items {
        println!(
            "item {}: unit {} x{} @ {}",
            item.id,
            item.unit_id,
            item.quantity,
            format_amount(item.unit_price)
        );
    }
    println!("item_count: {}", store.item_count());
    println!("total: {}", format_amount(store.total()));
    if let Some(lead) = cart.lead {
        println!("lead: {lead}");
    }
}

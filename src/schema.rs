// Kept in sync by hand with `DieselDbContext::init_schema`.

diesel::table! {
    templates (id) {
        id -> Text,
        slug -> Text,
        name -> Text,
        category -> Text,
        summary -> Text,
        description -> Text,
        price_cents -> BigInt,
        currency -> Text,
        preview_url -> Nullable<Text>,
        image_url -> Nullable<Text>,
        is_active -> Integer,
        sort_order -> Integer,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::table! {
    template_applications (id) {
        id -> Text,
        template_id -> Text,
        name -> Text,
        platform -> Text,
        description -> Text,
        demo_url -> Nullable<Text>,
        is_active -> Integer,
        created_at -> Text,
    }
}

diesel::table! {
    orders (id) {
        id -> Text,
        template_slug -> Text,
        customer_name -> Text,
        email -> Text,
        phone -> Text,
        amount_cents -> BigInt,
        currency -> Text,
        payment_platform -> Text,
        account_name -> Nullable<Text>,
        account_number -> Nullable<Text>,
        transaction_ref -> Nullable<Text>,
        notes -> Nullable<Text>,
        status -> Text,
        client_ip -> Text,
        created_at -> Text,
    }
}

diesel::joinable!(template_applications -> templates (template_id));

diesel::allow_tables_to_appear_in_same_query!(orders, template_applications, templates,);
